//! # Session Registry
//!
//! Tracks active login sessions with device and network context, and owns
//! every revocation path short of a password reset.
//!
//! ## Revocation Matrix
//!
//! | Operation | Refresh tokens | Sessions | Audit |
//! |-----------|----------------|----------|-------|
//! | `revoke` (single) | delete by value | deactivate by id | `SESSION_REVOKED` |
//! | `revoke_all_other` | delete all but current | deactivate all but current | `USER_LOGOUT_OTHER_DEVICES` |
//! | `revoke_all` | delete all | deactivate all | `USER_LOGOUT_ALL_DEVICES` |
//!
//! Revoking a session that doesn't belong to the caller reports
//! `SESSION_NOT_FOUND` - never "forbidden" - so the response doesn't
//! disclose whether the id exists.
//!
//! ## Device Parsing
//!
//! `User-Agent` strings are parsed best-effort with substring heuristics
//! into `{browser, os, device}`; anything unrecognized stays `None`. The
//! raw header is stored only on audit rows, never on the session itself.

use shared::auth::TokenPair;
use shared::errors::ApiError;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    AuditAction, NewAuditLog, NewSession, RequestContext, Session,
};
use crate::repository::{RefreshTokenRepository, SessionRepository};
use crate::service::AuditRecorder;

// =============================================================================
// USER-AGENT PARSING
// =============================================================================

/// Parsed device context, best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Browser family, e.g. "Chrome"
    pub browser: Option<String>,
    /// Operating system, e.g. "Windows"
    pub os: Option<String>,
    /// Friendly device name, e.g. "iPhone"
    pub device_name: Option<String>,
    /// Coarse class: "mobile" / "tablet" / "desktop"
    pub device_type: Option<String>,
}

/// Parses a `User-Agent` header into coarse device context.
///
/// Order matters for the browser checks: Edge and Opera embed "Chrome",
/// and Chrome embeds "Safari".
pub fn parse_user_agent(user_agent: Option<&str>) -> DeviceInfo {
    let Some(ua) = user_agent else {
        return DeviceInfo::default();
    };

    let browser = if ua.contains("Edg/") || ua.contains("Edge/") {
        Some("Edge")
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        Some("Opera")
    } else if ua.contains("Firefox/") {
        Some("Firefox")
    } else if ua.contains("Chrome/") {
        Some("Chrome")
    } else if ua.contains("Safari/") {
        Some("Safari")
    } else if ua.contains("curl/") {
        Some("curl")
    } else {
        None
    };

    let (os, device_name) = if ua.contains("iPhone") {
        (Some("iOS"), Some("iPhone"))
    } else if ua.contains("iPad") {
        (Some("iPadOS"), Some("iPad"))
    } else if ua.contains("Android") {
        (Some("Android"), Some("Android device"))
    } else if ua.contains("Windows") {
        (Some("Windows"), Some("Windows PC"))
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        (Some("macOS"), Some("Mac"))
    } else if ua.contains("Linux") {
        (Some("Linux"), Some("Linux PC"))
    } else {
        (None, None)
    };

    let device_type = if ua.contains("iPad") || ua.contains("Tablet") {
        Some("tablet")
    } else if ua.contains("Mobile") || ua.contains("iPhone") || ua.contains("Android") {
        Some("mobile")
    } else if os.is_some() {
        Some("desktop")
    } else {
        None
    };

    DeviceInfo {
        browser: browser.map(String::from),
        os: os.map(String::from),
        device_name: device_name.map(String::from),
        device_type: device_type.map(String::from),
    }
}

/// Builds the session row for a freshly issued token pair.
pub fn build_session(user_id: Uuid, pair: &TokenPair, ctx: &RequestContext) -> NewSession {
    let device = parse_user_agent(ctx.user_agent.as_deref());

    NewSession {
        user_id,
        refresh_token: pair.refresh_token.clone(),
        device_name: device.device_name,
        device_type: device.device_type,
        browser: device.browser,
        os: device.os,
        ip_address: ctx.ip_address.clone(),
        expires_at: pair.refresh_expires_at,
    }
}

// =============================================================================
// SESSION REGISTRY
// =============================================================================

/// Service for listing and revoking login sessions.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: SessionRepository,
    refresh_tokens: RefreshTokenRepository,
    audit: AuditRecorder,
}

/// A session as exposed to its owner - the raw refresh token never leaves
/// the service.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session identifier (the revocation handle)
    pub id: Uuid,
    /// Friendly device name
    pub device_name: Option<String>,
    /// Coarse device class
    pub device_type: Option<String>,
    /// Browser family
    pub browser: Option<String>,
    /// Operating system
    pub os: Option<String>,
    /// Client IP at login
    pub ip_address: Option<String>,
    /// Geo country, when resolved
    pub country: Option<String>,
    /// Geo city, when resolved
    pub city: Option<String>,
    /// Whether this row carries the caller's own refresh token
    pub current: bool,
    /// Last API activity
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    /// Session creation
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Session expiry
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl SessionView {
    fn from_session(session: Session, current_refresh_token: Option<&str>) -> Self {
        let current = current_refresh_token == Some(session.refresh_token.as_str());
        Self {
            id: session.id,
            device_name: session.device_name,
            device_type: session.device_type,
            browser: session.browser,
            os: session.os,
            ip_address: session.ip_address,
            country: session.country,
            city: session.city,
            current,
            last_activity_at: session.last_activity_at,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

impl SessionRegistry {
    /// Creates a new registry.
    pub fn new(
        sessions: SessionRepository,
        refresh_tokens: RefreshTokenRepository,
        audit: AuditRecorder,
    ) -> Self {
        Self { sessions, refresh_tokens, audit }
    }

    /// Lists the caller's active sessions, most recently active first.
    ///
    /// When the caller's refresh cookie is available the matching row is
    /// flagged `current` so clients can label "this device".
    pub async fn list_active(
        &self,
        user_id: Uuid,
        current_refresh_token: Option<&str>,
    ) -> Result<Vec<SessionView>, ApiError> {
        let sessions = self.sessions.list_active(user_id).await?;

        Ok(sessions
            .into_iter()
            .map(|s| SessionView::from_session(s, current_refresh_token))
            .collect())
    }

    /// Revokes a single session owned by the caller.
    ///
    /// A non-owned or unknown id reports the same `SESSION_NOT_FOUND`.
    pub async fn revoke(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<(), ApiError> {
        let session = self
            .sessions
            .find_owned(session_id, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("session:{}", session_id) })?;

        // Token first: a session without its credential is inert even if the
        // deactivation below doesn't land.
        self.refresh_tokens.delete_by_token(&session.refresh_token).await?;
        self.sessions.deactivate_by_id(session.id).await?;

        info!(user_id = %user_id, session_id = %session_id, "Session revoked");

        self.audit
            .record(
                NewAuditLog::of(AuditAction::SessionRevoked, user_id)
                    .on(format!("session:{}", session_id))
                    .with_context(ctx),
            )
            .await;

        Ok(())
    }

    /// Revokes every session except the one carrying the current refresh
    /// token. Returns the revoked count.
    pub async fn revoke_all_other(
        &self,
        user_id: Uuid,
        current_refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<u64, ApiError> {
        self.refresh_tokens.delete_all_except(user_id, current_refresh_token).await?;
        let revoked =
            self.sessions.deactivate_all_except(user_id, current_refresh_token).await?;

        info!(user_id = %user_id, revoked, "Logged out other devices");

        self.audit
            .record(
                NewAuditLog::of(AuditAction::UserLogoutOtherDevices, user_id)
                    .with_metadata(serde_json::json!({ "revokedCount": revoked }))
                    .with_context(ctx),
            )
            .await;

        Ok(revoked)
    }

    /// Revokes every session for the user. Returns the revoked count.
    pub async fn revoke_all(&self, user_id: Uuid, ctx: &RequestContext) -> Result<u64, ApiError> {
        let mut tx = self.sessions.begin().await?;
        self.refresh_tokens.delete_all_for_user(&mut *tx, user_id).await?;
        let revoked = self.sessions.deactivate_all(&mut *tx, user_id).await?;
        tx.commit().await?;

        info!(user_id = %user_id, revoked, "Logged out all devices");

        self.audit
            .record(
                NewAuditLog::of(AuditAction::UserLogoutAllDevices, user_id)
                    .with_metadata(serde_json::json!({ "revokedCount": revoked }))
                    .with_context(ctx),
            )
            .await;

        Ok(revoked)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                                 AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 \
                                 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                            (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

    #[test]
    fn test_parse_chrome_on_windows() {
        let info = parse_user_agent(Some(CHROME_WIN));

        assert_eq!(info.browser.as_deref(), Some("Chrome"));
        assert_eq!(info.os.as_deref(), Some("Windows"));
        assert_eq!(info.device_type.as_deref(), Some("desktop"));
    }

    #[test]
    fn test_parse_safari_on_iphone() {
        let info = parse_user_agent(Some(SAFARI_IPHONE));

        assert_eq!(info.browser.as_deref(), Some("Safari"));
        assert_eq!(info.os.as_deref(), Some("iOS"));
        assert_eq!(info.device_name.as_deref(), Some("iPhone"));
        assert_eq!(info.device_type.as_deref(), Some("mobile"));
    }

    #[test]
    fn test_parse_firefox_on_linux() {
        let info = parse_user_agent(Some(FIREFOX_LINUX));

        assert_eq!(info.browser.as_deref(), Some("Firefox"));
        assert_eq!(info.os.as_deref(), Some("Linux"));
        assert_eq!(info.device_type.as_deref(), Some("desktop"));
    }

    #[test]
    fn test_edge_not_mistaken_for_chrome() {
        let info = parse_user_agent(Some(EDGE_WIN));
        assert_eq!(info.browser.as_deref(), Some("Edge"));
    }

    #[test]
    fn test_unknown_agent_stays_none() {
        let info = parse_user_agent(Some("SomethingNobodyShips/1.0"));
        assert_eq!(info, DeviceInfo::default());

        assert_eq!(parse_user_agent(None), DeviceInfo::default());
    }

    #[test]
    fn test_session_view_never_exposes_token() {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token: "super-secret-refresh-token".to_string(),
            device_name: None,
            device_type: None,
            browser: None,
            os: None,
            ip_address: None,
            country: None,
            city: None,
            is_active: true,
            last_activity_at: chrono::Utc::now(),
            created_at: chrono::Utc::now(),
            expires_at: chrono::Utc::now(),
        };

        let view = SessionView::from_session(session, None);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("super-secret-refresh-token"));
        assert!(!json.contains("refreshToken"));
    }

    #[test]
    fn test_session_view_marks_current() {
        let make = |token: &str| Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token: token.to_string(),
            device_name: None,
            device_type: None,
            browser: None,
            os: None,
            ip_address: None,
            country: None,
            city: None,
            is_active: true,
            last_activity_at: chrono::Utc::now(),
            created_at: chrono::Utc::now(),
            expires_at: chrono::Utc::now(),
        };

        assert!(SessionView::from_session(make("t1"), Some("t1")).current);
        assert!(!SessionView::from_session(make("t1"), Some("t2")).current);
        assert!(!SessionView::from_session(make("t1"), None).current);
    }
}
