//! # GDPR Service
//!
//! Right-of-access export, self-service anonymization, admin permanent
//! deletion, and email change.
//!
//! ## Anonymization vs Permanent Deletion
//!
//! | | Anonymize (self) | Permanent delete (admin) |
//! |---|---|---|
//! | User row | retained, scrubbed | deleted |
//! | Audit rows | retained, sentinel-scrubbed | cascade per schema |
//! | Sessions / tokens | deleted | cascade |
//! | Trigger | password + confirmation literal | admin action |
//!
//! The anonymized user row is kept so audit-trail foreign keys stay intact;
//! its email becomes `anonymized_<id>@deleted.local` and the credential is
//! unusable.

use shared::{
    auth::{AuthenticatedUser, PasswordHasher},
    errors::ApiError,
    validation::normalize_email,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::EmailClient;
use crate::domain::{AuditAction, AuditLogEntry, NewAuditLog, RequestContext, UserSummary};
use crate::repository::{
    AuditLogRepository, MagicLinkRepository, RefreshTokenRepository, SessionRepository,
    UserRepository,
};
use crate::service::audit_service::AuditRecorder;

/// Confirmation literal required by self-service anonymization.
pub const ANONYMIZE_CONFIRMATION: &str = "ANONYMIZE_MY_DATA";

/// Sentinel written over scrubbed audit columns.
const ANONYMIZED: &str = "anonymized";

// =============================================================================
// EXPORT DOCUMENT
// =============================================================================

/// The right-of-access export bundle.
///
/// Refresh tokens appear as ids and lifetimes only - token values never
/// leave the service.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GdprExport {
    /// When the export was produced
    pub exported_at: chrono::DateTime<chrono::Utc>,
    /// The profile, sans credential
    pub profile: UserSummary,
    /// Full session history
    pub sessions: Vec<SessionExport>,
    /// The user's audit rows
    pub audit_logs: Vec<AuditLogEntry>,
    /// Index of refresh-token rows (ids and lifetimes only)
    pub refresh_tokens: Vec<RefreshTokenExport>,
}

/// A session in the export (no token value).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub id: Uuid,
    pub device_name: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub ip_address: Option<String>,
    pub is_active: bool,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// A refresh-token row in the export (id and lifetime only).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenExport {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// SERVICE STRUCT
// =============================================================================

/// Service for the GDPR operations.
#[derive(Clone)]
pub struct GdprService {
    users: UserRepository,
    sessions: SessionRepository,
    refresh_tokens: RefreshTokenRepository,
    magic_links: MagicLinkRepository,
    audit_logs: AuditLogRepository,
    password_hasher: Arc<PasswordHasher>,
    audit: AuditRecorder,
    email_client: EmailClient,
}

impl GdprService {
    /// Creates a new GDPR service instance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: UserRepository,
        sessions: SessionRepository,
        refresh_tokens: RefreshTokenRepository,
        magic_links: MagicLinkRepository,
        audit_logs: AuditLogRepository,
        password_hasher: Arc<PasswordHasher>,
        audit: AuditRecorder,
        email_client: EmailClient,
    ) -> Self {
        Self {
            users,
            sessions,
            refresh_tokens,
            magic_links,
            audit_logs,
            password_hasher,
            audit,
            email_client,
        }
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Bundles everything the platform holds about a user.
    pub async fn export_data(
        &self,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<GdprExport, ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        let sessions = self
            .sessions
            .list_all_for_user(user_id)
            .await?
            .into_iter()
            .map(|s| SessionExport {
                id: s.id,
                device_name: s.device_name,
                device_type: s.device_type,
                browser: s.browser,
                os: s.os,
                ip_address: s.ip_address,
                is_active: s.is_active,
                last_activity_at: s.last_activity_at,
                created_at: s.created_at,
                expires_at: s.expires_at,
            })
            .collect();

        let refresh_tokens = self
            .refresh_tokens
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|t| RefreshTokenExport {
                id: t.id,
                created_at: t.created_at,
                expires_at: t.expires_at,
            })
            .collect();

        let audit_logs = self.audit.recent_for_user(user_id).await?;

        self.audit
            .record(NewAuditLog::of(AuditAction::UserDataExported, user_id).with_context(ctx))
            .await;

        info!(user_id = %user_id, "User data exported");

        Ok(GdprExport {
            exported_at: chrono::Utc::now(),
            profile: user.into(),
            sessions,
            audit_logs,
            refresh_tokens,
        })
    }

    // =========================================================================
    // ANONYMIZATION
    // =========================================================================

    /// Irreversibly anonymizes the caller's account.
    ///
    /// Requires the confirmation literal and a correct password. The final
    /// `USER_DATA_ANONYMIZED` row is appended before the scrub, so it too
    /// ends up sentinel-scrubbed - by design the trail only shows *that*
    /// anonymization happened.
    pub async fn anonymize(
        &self,
        user_id: Uuid,
        confirmation: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<(), ApiError> {
        if confirmation != ANONYMIZE_CONFIRMATION {
            return Err(ApiError::BadRequest {
                message: format!("confirmation must be \"{}\"", ANONYMIZE_CONFIRMATION),
            });
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        if !self.password_hasher.verify(password, &user.password_hash)? {
            return Err(ApiError::InvalidCredentials);
        }

        let mut tx = self.users.begin().await?;

        // The marker row lands first, then the scrub sweeps it along with
        // the rest of the user's rows.
        self.audit
            .record_tx(
                &mut *tx,
                NewAuditLog::of(AuditAction::UserDataAnonymized, user_id).with_context(ctx),
            )
            .await;

        let scrubbed = self.audit_logs.anonymize_for_user(&mut *tx, user_id).await?;

        self.sessions.delete_all_for_user(&mut *tx, user_id).await?;
        self.refresh_tokens.delete_all_for_user(&mut *tx, user_id).await?;
        self.magic_links.delete_all_for_user(&mut *tx, user_id).await?;
        self.delete_oob_tokens(&mut *tx, user_id).await?;

        let anonymized_email = format!("{}_{}@deleted.local", ANONYMIZED, user_id);
        self.users.anonymize(&mut *tx, user_id, &anonymized_email).await?;

        tx.commit().await?;

        info!(user_id = %user_id, scrubbed_audit_rows = scrubbed, "User anonymized");

        Ok(())
    }

    /// Deletes the email-service-owned out-of-band token rows.
    ///
    /// Both services share one store, so anonymization can clear every
    /// credential in a single transaction.
    async fn delete_oob_tokens(
        &self,
        conn: &mut sqlx::PgConnection,
        user_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    // =========================================================================
    // PERMANENT DELETION
    // =========================================================================

    /// Permanently deletes a user and all dependents (admin).
    ///
    /// The audit row is written first with the identifiers pinned into
    /// metadata and no `user_id` reference, so it survives the cascade.
    pub async fn permanent_delete(
        &self,
        target_user_id: Uuid,
        admin: &AuthenticatedUser,
        ctx: &RequestContext,
    ) -> Result<(), ApiError> {
        if target_user_id == admin.user_id {
            return Err(ApiError::BadRequest {
                message: "cannot delete your own account".to_string(),
            });
        }

        let user = self
            .users
            .find_by_id(target_user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", target_user_id) })?;

        self.audit
            .record(
                NewAuditLog {
                    user_id: None,
                    performed_by: Some(admin.user_id),
                    action: AuditAction::UserPermanentlyDeleted,
                    resource: Some(format!("user:{}", target_user_id)),
                    ip_address: ctx.ip_address.clone(),
                    user_agent: ctx.user_agent.clone(),
                    metadata: serde_json::json!({
                        "userId": target_user_id,
                        "email": user.email,
                    }),
                    success: true,
                    error_message: None,
                },
            )
            .await;

        self.users.delete(target_user_id).await?;

        warn!(user_id = %target_user_id, admin_id = %admin.user_id, "User permanently deleted");

        Ok(())
    }

    // =========================================================================
    // EMAIL UPDATE
    // =========================================================================

    /// Changes the account email, resetting verification.
    ///
    /// The database change stands even when the verification dispatch
    /// fails - the user can retry from the unverified state.
    pub async fn update_email(
        &self,
        user_id: Uuid,
        new_email: &str,
        ctx: &RequestContext,
    ) -> Result<UserSummary, ApiError> {
        let new_email = normalize_email(new_email);

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        let old_email = user.email.clone();
        if old_email == new_email {
            return Err(ApiError::BadRequest {
                message: "new email matches the current address".to_string(),
            });
        }

        let updated = self.users.update_email(user_id, &new_email).await?;

        if let Err(e) = self.email_client.send_verification(user_id, &new_email).await {
            warn!(user_id = %user_id, error = %e, "Verification dispatch failed after email update");

            self.audit
                .record(
                    NewAuditLog::failure(
                        AuditAction::EmailUpdateFailed,
                        Some(user_id),
                        "verification email dispatch failed",
                    )
                    .with_metadata(serde_json::json!({
                        "oldEmail": old_email,
                        "newEmail": new_email,
                    }))
                    .with_context(ctx),
                )
                .await;

            return Err(e);
        }

        self.audit
            .record(
                NewAuditLog::of(AuditAction::EmailUpdated, user_id)
                    .with_metadata(serde_json::json!({
                        "oldEmail": old_email,
                        "newEmail": new_email,
                    }))
                    .with_context(ctx),
            )
            .await;

        info!(user_id = %user_id, "Email address updated");

        Ok(updated.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymize_confirmation_literal() {
        assert_eq!(ANONYMIZE_CONFIRMATION, "ANONYMIZE_MY_DATA");
    }

    #[test]
    fn test_anonymized_email_shape() {
        let id = Uuid::new_v4();
        let email = format!("{}_{}@deleted.local", ANONYMIZED, id);

        assert!(email.starts_with("anonymized_"));
        assert!(email.ends_with("@deleted.local"));
        assert!(email.contains(&id.to_string()));
    }

    #[test]
    fn test_export_serializes_without_token_values() {
        let export = GdprExport {
            exported_at: chrono::Utc::now(),
            profile: UserSummary {
                id: Uuid::new_v4(),
                email: "a@example.com".to_string(),
                role: "USER".to_string(),
                email_verified: true,
                last_login_at: None,
                created_at: chrono::Utc::now(),
            },
            sessions: vec![],
            audit_logs: vec![],
            refresh_tokens: vec![RefreshTokenExport {
                id: Uuid::new_v4(),
                created_at: chrono::Utc::now(),
                expires_at: chrono::Utc::now(),
            }],
        };

        let json = serde_json::to_string(&export).unwrap();
        // The refresh-token index carries ids and lifetimes, never a value
        assert!(!json.contains("\"token\""));
        assert!(json.contains("refreshTokens"));
    }
}
