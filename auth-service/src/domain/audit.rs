//! # Audit Trail Domain
//!
//! Every state transition in the platform leaves exactly one append-only
//! audit row. The action taxonomy below is exhaustive - the system never
//! invents ad-hoc action strings, and the admin query API filters on these
//! values verbatim.
//!
//! ## Row Lifecycle
//!
//! Audit rows are written once and never updated, with a single exception:
//! GDPR anonymization overwrites `resource`, `ip_address`, and `user_agent`
//! with the `"anonymized"` sentinel and replaces `metadata` with
//! `{"anonymized": true}`. A retention sweeper deletes rows older than the
//! configured window (default 90 days).
//!
//! ## Failure Semantics
//!
//! A failed audit write is logged and swallowed - the domain action has
//! already happened when the audit attempt is made, so the write can never
//! mask the primary result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// AUDIT ACTIONS
// =============================================================================

/// The exhaustive set of auditable actions.
///
/// Stored as text in the `audit_logs.action` column; the serialized form is
/// the SCREAMING_SNAKE_CASE variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    UserLogout,
    UserLogoutAllDevices,
    UserLogoutOtherDevices,
    EmailVerified,
    PasswordResetRequested,
    PasswordResetCompleted,
    TokenRefreshed,
    RoleChanged,
    UserDeleted,
    UsersBulkDeleted,
    SessionRevoked,
    AccountLocked,
    AccountUnlocked,
    LoginFailed,
    VerificationEmailSent,
    ResetEmailSent,
    MagicLinkRequested,
    MagicLinkSent,
    MagicLinkLogin,
    MagicLinkFailed,
    UserDataExported,
    UserDataAnonymized,
    UserPermanentlyDeleted,
    EmailUpdated,
    EmailUpdateFailed,
}

impl AuditAction {
    /// Returns the stored string form of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegister => "USER_REGISTER",
            Self::UserLogin => "USER_LOGIN",
            Self::UserLogout => "USER_LOGOUT",
            Self::UserLogoutAllDevices => "USER_LOGOUT_ALL_DEVICES",
            Self::UserLogoutOtherDevices => "USER_LOGOUT_OTHER_DEVICES",
            Self::EmailVerified => "EMAIL_VERIFIED",
            Self::PasswordResetRequested => "PASSWORD_RESET_REQUESTED",
            Self::PasswordResetCompleted => "PASSWORD_RESET_COMPLETED",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::RoleChanged => "ROLE_CHANGED",
            Self::UserDeleted => "USER_DELETED",
            Self::UsersBulkDeleted => "USERS_BULK_DELETED",
            Self::SessionRevoked => "SESSION_REVOKED",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AccountUnlocked => "ACCOUNT_UNLOCKED",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::VerificationEmailSent => "VERIFICATION_EMAIL_SENT",
            Self::ResetEmailSent => "RESET_EMAIL_SENT",
            Self::MagicLinkRequested => "MAGIC_LINK_REQUESTED",
            Self::MagicLinkSent => "MAGIC_LINK_SENT",
            Self::MagicLinkLogin => "MAGIC_LINK_LOGIN",
            Self::MagicLinkFailed => "MAGIC_LINK_FAILED",
            Self::UserDataExported => "USER_DATA_EXPORTED",
            Self::UserDataAnonymized => "USER_DATA_ANONYMIZED",
            Self::UserPermanentlyDeleted => "USER_PERMANENTLY_DELETED",
            Self::EmailUpdated => "EMAIL_UPDATED",
            Self::EmailUpdateFailed => "EMAIL_UPDATE_FAILED",
        }
    }

    /// Parses a stored action string back into the enum.
    ///
    /// Returns `None` for unknown values so the admin filter can reject
    /// garbage input instead of silently matching nothing.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER_REGISTER" => Some(Self::UserRegister),
            "USER_LOGIN" => Some(Self::UserLogin),
            "USER_LOGOUT" => Some(Self::UserLogout),
            "USER_LOGOUT_ALL_DEVICES" => Some(Self::UserLogoutAllDevices),
            "USER_LOGOUT_OTHER_DEVICES" => Some(Self::UserLogoutOtherDevices),
            "EMAIL_VERIFIED" => Some(Self::EmailVerified),
            "PASSWORD_RESET_REQUESTED" => Some(Self::PasswordResetRequested),
            "PASSWORD_RESET_COMPLETED" => Some(Self::PasswordResetCompleted),
            "TOKEN_REFRESHED" => Some(Self::TokenRefreshed),
            "ROLE_CHANGED" => Some(Self::RoleChanged),
            "USER_DELETED" => Some(Self::UserDeleted),
            "USERS_BULK_DELETED" => Some(Self::UsersBulkDeleted),
            "SESSION_REVOKED" => Some(Self::SessionRevoked),
            "ACCOUNT_LOCKED" => Some(Self::AccountLocked),
            "ACCOUNT_UNLOCKED" => Some(Self::AccountUnlocked),
            "LOGIN_FAILED" => Some(Self::LoginFailed),
            "VERIFICATION_EMAIL_SENT" => Some(Self::VerificationEmailSent),
            "RESET_EMAIL_SENT" => Some(Self::ResetEmailSent),
            "MAGIC_LINK_REQUESTED" => Some(Self::MagicLinkRequested),
            "MAGIC_LINK_SENT" => Some(Self::MagicLinkSent),
            "MAGIC_LINK_LOGIN" => Some(Self::MagicLinkLogin),
            "MAGIC_LINK_FAILED" => Some(Self::MagicLinkFailed),
            "USER_DATA_EXPORTED" => Some(Self::UserDataExported),
            "USER_DATA_ANONYMIZED" => Some(Self::UserDataAnonymized),
            "USER_PERMANENTLY_DELETED" => Some(Self::UserPermanentlyDeleted),
            "EMAIL_UPDATED" => Some(Self::EmailUpdated),
            "EMAIL_UPDATE_FAILED" => Some(Self::EmailUpdateFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// AUDIT LOG ROWS
// =============================================================================

/// An audit row as stored in `audit_logs`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Unique row identifier
    pub id: Uuid,
    /// Affected user; NULL for system-level rows
    pub user_id: Option<Uuid>,
    /// The admin who performed the action, when administrative
    pub performed_by: Option<Uuid>,
    /// Stored action string (one of [`AuditAction`])
    pub action: String,
    /// Affected resource identifier, when applicable
    pub resource: Option<String>,
    /// Client IP at the time of the action
    pub ip_address: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
    /// Structured action-specific context
    pub metadata: serde_json::Value,
    /// Whether the underlying operation succeeded
    pub success: bool,
    /// Failure detail for unsuccessful operations
    pub error_message: Option<String>,
    /// Append timestamp
    pub created_at: DateTime<Utc>,
}

/// Data required to append an audit row.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    /// Affected user; None for system-level rows
    pub user_id: Option<Uuid>,
    /// Acting admin for administrative operations
    pub performed_by: Option<Uuid>,
    /// The action taken
    pub action: AuditAction,
    /// Affected resource identifier
    pub resource: Option<String>,
    /// Client IP
    pub ip_address: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
    /// Structured action-specific context
    pub metadata: serde_json::Value,
    /// Whether the operation succeeded (defaults to true)
    pub success: bool,
    /// Failure detail
    pub error_message: Option<String>,
}

impl NewAuditLog {
    /// Starts a successful audit row for a user-scoped action.
    pub fn of(action: AuditAction, user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            performed_by: None,
            action,
            resource: None,
            ip_address: None,
            user_agent: None,
            metadata: serde_json::json!({}),
            success: true,
            error_message: None,
        }
    }

    /// Starts a failed audit row for a user-scoped action.
    pub fn failure(action: AuditAction, user_id: Option<Uuid>, error: impl Into<String>) -> Self {
        Self {
            user_id,
            performed_by: None,
            action,
            resource: None,
            ip_address: None,
            user_agent: None,
            metadata: serde_json::json!({}),
            success: false,
            error_message: Some(error.into()),
        }
    }

    /// Records the acting admin.
    pub fn by(mut self, admin_id: Uuid) -> Self {
        self.performed_by = Some(admin_id);
        self
    }

    /// Attaches the request's client context.
    pub fn with_context(mut self, ctx: &crate::domain::RequestContext) -> Self {
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    /// Names the affected resource.
    pub fn on(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// =============================================================================
// ADMIN QUERY
// =============================================================================

/// Filters for the admin audit query.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    /// Restrict to one user's rows
    pub user_id: Option<Uuid>,
    /// Restrict to one action
    pub action: Option<AuditAction>,
    /// Restrict by outcome
    pub success: Option<bool>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
}

/// One page of audit rows with offset pagination bookkeeping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogPage {
    /// The rows of this page, newest first
    pub logs: Vec<AuditLogEntry>,
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total matching rows
    pub total: i64,
    /// Total pages at this limit
    pub total_pages: u32,
}

impl AuditLogPage {
    /// Computes the page count for a total at the given limit.
    pub fn pages_for(total: i64, limit: u32) -> u32 {
        if limit == 0 {
            return 0;
        }
        ((total as u64).div_ceil(limit as u64)) as u32
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [AuditAction; 27] = [
        AuditAction::UserRegister,
        AuditAction::UserLogin,
        AuditAction::UserLogout,
        AuditAction::UserLogoutAllDevices,
        AuditAction::UserLogoutOtherDevices,
        AuditAction::EmailVerified,
        AuditAction::PasswordResetRequested,
        AuditAction::PasswordResetCompleted,
        AuditAction::TokenRefreshed,
        AuditAction::RoleChanged,
        AuditAction::UserDeleted,
        AuditAction::UsersBulkDeleted,
        AuditAction::SessionRevoked,
        AuditAction::AccountLocked,
        AuditAction::AccountUnlocked,
        AuditAction::LoginFailed,
        AuditAction::VerificationEmailSent,
        AuditAction::ResetEmailSent,
        AuditAction::MagicLinkRequested,
        AuditAction::MagicLinkSent,
        AuditAction::MagicLinkLogin,
        AuditAction::MagicLinkFailed,
        AuditAction::UserDataExported,
        AuditAction::UserDataAnonymized,
        AuditAction::UserPermanentlyDeleted,
        AuditAction::EmailUpdated,
        AuditAction::EmailUpdateFailed,
    ];

    #[test]
    fn test_every_action_round_trips_through_storage_form() {
        for action in ALL_ACTIONS {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_storage_forms_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for action in ALL_ACTIONS {
            assert!(seen.insert(action.as_str()), "duplicate: {}", action);
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(AuditAction::parse("NOT_AN_ACTION"), None);
        assert_eq!(AuditAction::parse("user_login"), None);
    }

    #[test]
    fn test_serde_form_matches_storage_form() {
        let json = serde_json::to_string(&AuditAction::MagicLinkLogin).unwrap();
        assert_eq!(json, "\"MAGIC_LINK_LOGIN\"");

        let parsed: AuditAction = serde_json::from_str("\"USER_LOGOUT_ALL_DEVICES\"").unwrap();
        assert_eq!(parsed, AuditAction::UserLogoutAllDevices);
    }

    #[test]
    fn test_builder_defaults() {
        let user_id = Uuid::new_v4();
        let log = NewAuditLog::of(AuditAction::UserLogin, user_id);

        assert_eq!(log.user_id, Some(user_id));
        assert!(log.success);
        assert!(log.error_message.is_none());
        assert!(log.performed_by.is_none());
    }

    #[test]
    fn test_builder_failure_and_admin() {
        let admin = Uuid::new_v4();
        let log = NewAuditLog::failure(AuditAction::LoginFailed, None, "invalid password")
            .by(admin)
            .on("user:123");

        assert!(!log.success);
        assert_eq!(log.error_message.as_deref(), Some("invalid password"));
        assert_eq!(log.performed_by, Some(admin));
        assert_eq!(log.resource.as_deref(), Some("user:123"));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(AuditLogPage::pages_for(0, 20), 0);
        assert_eq!(AuditLogPage::pages_for(1, 20), 1);
        assert_eq!(AuditLogPage::pages_for(20, 20), 1);
        assert_eq!(AuditLogPage::pages_for(21, 20), 2);
        assert_eq!(AuditLogPage::pages_for(100, 0), 0);
    }
}
