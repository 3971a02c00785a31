//! # Magic Link Flow
//!
//! Passwordless login that doubles as silent signup.
//!
//! ## Request
//!
//! ```text
//!  email ──► user exists? ──no──► create account (random credential,
//!    │                            unverified, role USER)
//!    ▼
//!  locked? ──yes──► refuse (same semantics as login)
//!    │
//!    ▼
//!  purge unused links ──► mint token ──► email service ──► uniform reply
//! ```
//!
//! The response is identical for new and existing accounts, so the endpoint
//! cannot be used to probe which addresses are registered.
//!
//! ## Redemption
//!
//! One-shot: the row flips `used = TRUE` under a row lock, so a replayed
//! link uniformly reports "already used" even inside its TTL. Redemption
//! proves possession of the mailbox, which also flips `email_verified`.

use shared::{
    auth::{EmailTokenCodec, OobTokenKind, PasswordHasher, TokenCodec},
    errors::ApiError,
    validation::normalize_email,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::EmailClient;
use crate::domain::{AuditAction, NewAuditLog, NewUser, RequestContext};
use crate::repository::{
    MagicLinkRepository, RefreshTokenRepository, SessionRepository, UserRepository,
};
use crate::service::{audit_service::AuditRecorder, auth_service::AuthResponse, session_service};

/// Uniform reply for every magic-link request.
pub const MAGIC_LINK_MESSAGE: &str =
    "If the email address is valid, a magic link has been sent. It expires in 15 minutes.";

// =============================================================================
// SERVICE STRUCT
// =============================================================================

/// Service for the passwordless login flow.
#[derive(Clone)]
pub struct MagicLinkService {
    users: UserRepository,
    sessions: SessionRepository,
    refresh_tokens: RefreshTokenRepository,
    magic_links: MagicLinkRepository,
    codec: Arc<TokenCodec>,
    email_codec: Arc<EmailTokenCodec>,
    password_hasher: Arc<PasswordHasher>,
    audit: AuditRecorder,
    email_client: EmailClient,
}

impl MagicLinkService {
    /// Creates a new magic-link service instance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: UserRepository,
        sessions: SessionRepository,
        refresh_tokens: RefreshTokenRepository,
        magic_links: MagicLinkRepository,
        codec: Arc<TokenCodec>,
        email_codec: Arc<EmailTokenCodec>,
        password_hasher: Arc<PasswordHasher>,
        audit: AuditRecorder,
        email_client: EmailClient,
    ) -> Self {
        Self {
            users,
            sessions,
            refresh_tokens,
            magic_links,
            codec,
            email_codec,
            password_hasher,
            audit,
            email_client,
        }
    }

    // =========================================================================
    // REQUEST
    // =========================================================================

    /// Requests a magic link, silently creating the account if needed.
    ///
    /// Returns the uniform [`MAGIC_LINK_MESSAGE`] so callers can't
    /// distinguish new accounts from existing ones.
    pub async fn request(&self, email: &str, ctx: &RequestContext) -> Result<&'static str, ApiError> {
        let email = normalize_email(email);
        let now = chrono::Utc::now();

        let (user, is_new_user) = match self.users.find_by_email(&email).await? {
            Some(user) => (user, false),
            None => {
                // First touch: the account exists from here on, with a
                // credential nobody holds.
                let placeholder = self.password_hasher.hash(&random_credential())?;
                let user = self
                    .users
                    .create(NewUser {
                        email: email.clone(),
                        password_hash: placeholder,
                        role: "USER".to_string(),
                        email_verified: false,
                    })
                    .await?;

                info!(user_id = %user.id, "Account created via magic-link request");

                self.audit
                    .record(
                        NewAuditLog::of(AuditAction::UserRegister, user.id)
                            .with_metadata(serde_json::json!({
                                "email": email,
                                "via": "magic_link",
                            }))
                            .with_context(ctx),
                    )
                    .await;

                (user, true)
            }
        };

        if let Some(until) = user.locked_until(now) {
            self.audit
                .record(
                    NewAuditLog::failure(
                        AuditAction::MagicLinkFailed,
                        Some(user.id),
                        "account locked",
                    )
                    .with_context(ctx),
                )
                .await;
            return Err(ApiError::AccountLocked { until });
        }

        // Only the newest unused link per user is ever redeemable.
        self.magic_links.delete_unused_for_user(user.id).await?;

        let (token, expires_at) = self.email_codec.mint(user.id, OobTokenKind::MagicLink)?;
        self.magic_links.insert(user.id, &token, expires_at).await?;

        self.audit
            .record(
                NewAuditLog::of(AuditAction::MagicLinkRequested, user.id)
                    .with_metadata(serde_json::json!({ "isNewUser": is_new_user }))
                    .with_context(ctx),
            )
            .await;

        self.email_client.send_magic_link(&user.email, &token, is_new_user).await?;

        self.audit
            .record(NewAuditLog::of(AuditAction::MagicLinkSent, user.id).with_context(ctx))
            .await;

        info!(user_id = %user.id, is_new_user, "Magic link dispatched");

        Ok(MAGIC_LINK_MESSAGE)
    }

    // =========================================================================
    // REDEMPTION
    // =========================================================================

    /// Redeems a magic link: one-shot login plus email verification.
    pub async fn redeem(&self, token: &str, ctx: &RequestContext) -> Result<AuthResponse, ApiError> {
        // Signature first - a forged or mis-kinded token never touches the DB.
        let claims = self.email_codec.verify(token, OobTokenKind::MagicLink).map_err(|e| {
            match e {
                ApiError::TokenExpired => ApiError::BadRequest {
                    message: "magic link expired".to_string(),
                },
                _ => ApiError::BadRequest { message: "invalid magic link".to_string() },
            }
        })?;

        let now = chrono::Utc::now();
        let mut tx = self.users.begin().await?;

        let row = match self.magic_links.find_for_update(&mut *tx, token).await? {
            Some(row) => row,
            None => {
                drop(tx);
                self.record_failure(claims.sub, "unknown magic link", ctx).await;
                return Err(ApiError::BadRequest { message: "invalid magic link".to_string() });
            }
        };

        if row.used {
            drop(tx);
            self.record_failure(row.user_id, "magic link already used", ctx).await;
            return Err(ApiError::BadRequest {
                message: "magic link already used".to_string(),
            });
        }

        if row.expires_at < now {
            // Amortized cleanup: expiry rejection deletes the row.
            self.magic_links.delete_by_id(&mut *tx, row.id).await?;
            tx.commit().await?;
            self.record_failure(row.user_id, "magic link expired", ctx).await;
            return Err(ApiError::BadRequest { message: "magic link expired".to_string() });
        }

        if claims.sub != row.user_id {
            drop(tx);
            warn!(token_user = %row.user_id, claim_user = %claims.sub, "Magic link claim mismatch");
            self.record_failure(row.user_id, "magic link claim mismatch", ctx).await;
            return Err(ApiError::BadRequest { message: "invalid magic link".to_string() });
        }

        let user = self
            .users
            .find_by_id_for_update(&mut *tx, row.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        if let Some(until) = user.locked_until(now) {
            drop(tx);
            self.record_failure(user.id, "account locked", ctx).await;
            return Err(ApiError::AccountLocked { until });
        }

        // Consume the link and land the login in one commit.
        self.magic_links
            .mark_used(&mut *tx, row.id, ctx.ip_address.as_deref(), ctx.user_agent.as_deref())
            .await?;

        self.users
            .record_magic_login(&mut *tx, user.id, ctx.ip_address.as_deref())
            .await?;

        let pair = self.codec.generate_pair(user.id, &user.role, user.token_version)?;
        self.refresh_tokens
            .insert(&mut *tx, user.id, &pair.refresh_token, pair.refresh_expires_at)
            .await?;
        let new_session = session_service::build_session(user.id, &pair, ctx);
        self.sessions.create(&mut *tx, new_session).await?;

        self.audit
            .record_tx(
                &mut *tx,
                NewAuditLog::of(AuditAction::MagicLinkLogin, user.id).with_context(ctx),
            )
            .await;

        tx.commit().await?;

        info!(user_id = %user.id, "Magic link redeemed");

        let mut user = user;
        user.email_verified = true;
        user.failed_login_attempts = 0;
        user.account_locked_until = None;
        user.last_login_at = Some(now);
        user.last_login_ip = ctx.ip_address.clone();

        Ok(AuthResponse { tokens: pair, user: user.into() })
    }

    /// Records a failed redemption attempt.
    async fn record_failure(&self, user_id: uuid::Uuid, reason: &str, ctx: &RequestContext) {
        self.audit
            .record(
                NewAuditLog::failure(AuditAction::MagicLinkFailed, Some(user_id), reason)
                    .with_context(ctx),
            )
            .await;
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Mints an unguessable placeholder credential for silent signup.
///
/// The user never receives it; they authenticate via links until they set a
/// real password through the reset flow.
fn random_credential() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_credential_is_long_and_unique() {
        let a = random_credential();
        let b = random_credential();

        assert_eq!(a.len(), 64); // 32 bytes hex-encoded
        assert_ne!(a, b);
    }

    #[test]
    fn test_uniform_message_mentions_no_account_state() {
        assert!(!MAGIC_LINK_MESSAGE.contains("new"));
        assert!(!MAGIC_LINK_MESSAGE.contains("exist"));
    }
}
