//! # Email Flow Service
//!
//! The out-of-band flows this service owns: email verification, password
//! reset, and rendering/dispatch of the magic link minted by the auth
//! service.
//!
//! ## Password Reset - the Epoch Bump
//!
//! `reset_password` is the platform's global invalidation point. In ONE
//! transaction:
//!
//! ```text
//! mark token used ─┐
//! new bcrypt hash  ├─► commit ─► every JWT issued before this instant is
//! counters cleared │            dead (token_version mismatch), every
//! token_version+1  │            refresh token deleted, every session
//! wipe credentials ┘            deactivated
//! ```
//!
//! ## Enumeration Resistance
//!
//! `send_password_reset` answers identically whether the address exists or
//! not. The only observable difference is the email itself.

use shared::{
    auth::{EmailTokenCodec, OobTokenKind, PasswordHasher},
    errors::ApiError,
    validation::normalize_email,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::{AuditClient, AuditEvent};
use crate::domain::RequestContext;
use crate::repository::{
    PasswordResetTokenRepository, UserRepository, VerificationTokenRepository,
};
use crate::service::{mailer::MailSender, templates};

/// Uniform reply for every password-reset request.
pub const RESET_REQUEST_MESSAGE: &str =
    "If an account exists with this email, a password reset link has been sent.";

/// Reply after a completed reset; the session wipe is part of the contract.
pub const RESET_DONE_MESSAGE: &str =
    "Password reset successfully. All existing sessions have been terminated - \
     please log in with your new password.";

// =============================================================================
// SERVICE STRUCT
// =============================================================================

/// Service for the verification and reset flows.
#[derive(Clone)]
pub struct EmailFlowService {
    users: UserRepository,
    verification_tokens: VerificationTokenRepository,
    reset_tokens: PasswordResetTokenRepository,
    email_codec: Arc<EmailTokenCodec>,
    password_hasher: Arc<PasswordHasher>,
    mailer: MailSender,
    audit: AuditClient,
    /// Base URL of the browser client; links point here
    client_url: String,
}

impl EmailFlowService {
    /// Creates a new email-flow service instance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: UserRepository,
        verification_tokens: VerificationTokenRepository,
        reset_tokens: PasswordResetTokenRepository,
        email_codec: Arc<EmailTokenCodec>,
        password_hasher: Arc<PasswordHasher>,
        mailer: MailSender,
        audit: AuditClient,
        client_url: String,
    ) -> Self {
        Self {
            users,
            verification_tokens,
            reset_tokens,
            email_codec,
            password_hasher,
            mailer,
            audit,
            client_url: client_url.trim_end_matches('/').to_string(),
        }
    }

    // =========================================================================
    // EMAIL VERIFICATION
    // =========================================================================

    /// Mints and dispatches a verification token for a user.
    pub async fn send_verification(&self, user_id: Uuid, email: &str) -> Result<(), ApiError> {
        let email = normalize_email(email);

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        // Minting purges predecessors - one live token per user.
        self.verification_tokens.delete_for_user(user.id).await?;

        let (token, expires_at) = self.email_codec.mint(user.id, OobTokenKind::Verification)?;
        self.verification_tokens.insert(user.id, &token, expires_at).await?;

        let link = format!("{}/verify-email?token={}", self.client_url, token);
        let mut message = templates::verification_email(&link, templates::display_name(&email));
        message.to = email.clone();

        self.mailer.send(message).await?;

        self.audit
            .record(
                AuditEvent::of("VERIFICATION_EMAIL_SENT", user.id)
                    .with_metadata(serde_json::json!({ "email": email })),
            )
            .await;

        info!(user_id = %user.id, "Verification email dispatched");

        Ok(())
    }

    /// Consumes a verification token and marks the address proven.
    pub async fn verify_email(&self, token: &str) -> Result<(), ApiError> {
        self.email_codec.verify(token, OobTokenKind::Verification).map_err(|e| match e {
            ApiError::TokenExpired => ApiError::BadRequest {
                message: "verification token expired".to_string(),
            },
            _ => ApiError::BadRequest { message: "invalid verification token".to_string() },
        })?;

        let now = chrono::Utc::now();
        let mut tx = self.users.begin().await?;

        let row = self
            .verification_tokens
            .find_for_update(&mut *tx, token)
            .await?
            .ok_or_else(|| ApiError::BadRequest {
                message: "invalid verification token".to_string(),
            })?;

        if row.expires_at < now {
            // Amortized cleanup on expiry rejection.
            self.verification_tokens.delete_by_id(&mut *tx, row.id).await?;
            tx.commit().await?;
            return Err(ApiError::BadRequest {
                message: "verification token expired".to_string(),
            });
        }

        let user = self
            .users
            .find_by_id_for_update(&mut *tx, row.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        if user.email_verified {
            // Stale token for an already-proven address; consume it anyway.
            self.verification_tokens.delete_by_id(&mut *tx, row.id).await?;
            tx.commit().await?;
            return Err(ApiError::BadRequest { message: "email already verified".to_string() });
        }

        self.users.mark_email_verified(&mut *tx, user.id).await?;
        self.verification_tokens.delete_by_id(&mut *tx, row.id).await?;

        tx.commit().await?;

        self.audit
            .record(
                AuditEvent::of("EMAIL_VERIFIED", user.id)
                    .with_metadata(serde_json::json!({ "email": user.email })),
            )
            .await;

        info!(user_id = %user.id, "Email verified");

        Ok(())
    }

    /// Re-sends the verification email for an unverified account.
    pub async fn resend_verification(&self, email: &str) -> Result<(), ApiError> {
        let email = normalize_email(email);

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        if user.email_verified {
            return Err(ApiError::BadRequest { message: "email already verified".to_string() });
        }

        self.send_verification(user.id, &email).await
    }

    // =========================================================================
    // PASSWORD RESET
    // =========================================================================

    /// Requests a password reset link.
    ///
    /// Always returns [`RESET_REQUEST_MESSAGE`] - an unknown address takes
    /// the same path minus the email.
    pub async fn send_password_reset(
        &self,
        email: &str,
        ctx: &RequestContext,
    ) -> Result<&'static str, ApiError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(RESET_REQUEST_MESSAGE);
        };

        self.reset_tokens.delete_unused_for_user(user.id).await?;

        let (token, expires_at) = self.email_codec.mint(user.id, OobTokenKind::PasswordReset)?;
        self.reset_tokens.insert(user.id, &token, expires_at).await?;

        let link = format!("{}/reset-password?token={}", self.client_url, token);
        let mut message = templates::password_reset_email(&link, templates::display_name(&email));
        message.to = email.clone();

        self.mailer.send(message).await?;

        self.audit
            .record(AuditEvent::of("PASSWORD_RESET_REQUESTED", user.id).with_context(ctx))
            .await;
        self.audit
            .record(
                AuditEvent::of("RESET_EMAIL_SENT", user.id)
                    .with_metadata(serde_json::json!({ "email": email })),
            )
            .await;

        info!(user_id = %user.id, "Password reset email dispatched");

        Ok(RESET_REQUEST_MESSAGE)
    }

    /// Applies a password reset - the global token invalidation point.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<&'static str, ApiError> {
        let claims =
            self.email_codec.verify(token, OobTokenKind::PasswordReset).map_err(|e| match e {
                ApiError::TokenExpired => ApiError::BadRequest {
                    message: "reset token expired".to_string(),
                },
                _ => ApiError::BadRequest { message: "invalid reset token".to_string() },
            })?;

        let now = chrono::Utc::now();
        let mut tx = self.users.begin().await?;

        let row = self
            .reset_tokens
            .find_for_update(&mut *tx, token)
            .await?
            .ok_or_else(|| ApiError::BadRequest { message: "invalid reset token".to_string() })?;

        if row.used {
            drop(tx);
            return Err(ApiError::BadRequest {
                message: "reset token already used".to_string(),
            });
        }

        if row.expires_at < now {
            self.reset_tokens.delete_by_id(&mut *tx, row.id).await?;
            tx.commit().await?;
            return Err(ApiError::BadRequest { message: "reset token expired".to_string() });
        }

        if claims.sub != row.user_id {
            drop(tx);
            warn!(row_user = %row.user_id, claim_user = %claims.sub, "Reset token claim mismatch");
            return Err(ApiError::BadRequest { message: "invalid reset token".to_string() });
        }

        let user = self
            .users
            .find_by_id_for_update(&mut *tx, row.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        let password_hash = self.password_hasher.hash(new_password)?;

        // The one-commit epoch bump: hash, counters, token_version, and the
        // credential wipe land together or not at all.
        self.reset_tokens
            .mark_used(&mut *tx, row.id, ctx.ip_address.as_deref(), ctx.user_agent.as_deref())
            .await?;
        self.users.apply_password_reset(&mut *tx, user.id, &password_hash).await?;
        let tokens_deleted = self.users.delete_refresh_tokens(&mut *tx, user.id).await?;
        let sessions_closed = self.users.deactivate_sessions(&mut *tx, user.id).await?;

        tx.commit().await?;

        self.audit
            .record(
                AuditEvent::of("PASSWORD_RESET_COMPLETED", user.id)
                    .with_metadata(serde_json::json!({
                        "refreshTokensDeleted": tokens_deleted,
                        "sessionsTerminated": sessions_closed,
                    }))
                    .with_context(ctx),
            )
            .await;

        info!(
            user_id = %user.id,
            sessions_closed,
            "Password reset completed, token epoch bumped"
        );

        Ok(RESET_DONE_MESSAGE)
    }

    // =========================================================================
    // MAGIC LINK DISPATCH
    // =========================================================================

    /// Renders and dispatches a magic link minted by the auth service.
    ///
    /// The auth service owns the token row; this service only delivers.
    pub async fn send_magic_link(
        &self,
        email: &str,
        token: &str,
        is_new_user: bool,
    ) -> Result<(), ApiError> {
        let email = normalize_email(email);

        let link = format!("{}/magic-login?token={}", self.client_url, token);
        let mut message =
            templates::magic_link_email(&link, templates::display_name(&email), is_new_user);
        message.to = email;

        self.mailer.send(message).await?;

        info!(is_new_user, "Magic link email dispatched");

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_request_message_is_uniform() {
        // The exact wording must not hint at account existence.
        assert!(RESET_REQUEST_MESSAGE.starts_with("If an account exists"));
    }

    #[test]
    fn test_reset_done_message_mentions_session_termination() {
        assert!(RESET_DONE_MESSAGE.contains("sessions have been terminated"));
    }
}
