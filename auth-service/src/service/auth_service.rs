//! # Authentication Service
//!
//! Core business logic for credential authentication and the token economy:
//! registration, the login state machine with lockout, refresh rotation,
//! logout, access-token verification, and the admin user operations.
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Token Architecture                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                      ┌─────────────────────────┐   │
//! │  │  Access Token   │                      │    Refresh Token        │   │
//! │  │  (JWT, 15 min)  │                      │    (JWT, 7 days)        │   │
//! │  └────────┬────────┘                      └───────────┬─────────────┘   │
//! │           │ Carried in:                               │ Carried in:     │
//! │           │ - Authorization header                    │ - HttpOnly      │
//! │           │                                           │   cookie        │
//! │           │ Backed by:                                │ Backed by:      │
//! │           │ - token_version epoch                     │ - refresh_tokens│
//! │           │   (checked per request)                   │   + sessions    │
//! │           ▼                                           ▼                 │
//! │  ┌─────────────────┐                      ┌─────────────────────────┐   │
//! │  │ Stateless sig + │                      │ Stateful: rotated on    │   │
//! │  │ epoch check     │                      │ every use, revocable    │   │
//! │  └─────────────────┘                      └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactional Boundaries
//!
//! The login state machine (password check + attempt counter + lockout) and
//! the refresh rotation (delete old + deactivate session + insert new) each
//! run inside one transaction holding a `FOR UPDATE` lock on the user or
//! token row. Two concurrent wrong-password attempts therefore serialize:
//! the fifth failure always locks.
//!
//! ## Error Handling
//!
//! | Scenario | Error | HTTP Status |
//! |-----------------------|------------------------|-------------|
//! | Unknown user on login | `NotFound` | 404 |
//! | Unverified email | `EmailNotVerified` | 401 |
//! | Wrong password | `InvalidCredentials` | 401 |
//! | Locked account | `AccountLocked` | 423 |
//! | Rotated/unknown refresh | `InvalidToken` | 401 |
//! | Stale token epoch | `TokenInvalidated` | 401 |

use shared::{
    auth::{AuthenticatedUser, PasswordHasher, Role, TokenCodec, TokenPair},
    errors::ApiError,
    validation::normalize_email,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::EmailClient;
use crate::domain::{
    lockout, AuditAction, NewAuditLog, NewUser, RequestContext, User, UserSummary,
};
use crate::repository::{
    RefreshTokenRepository, SessionRepository, UserRepository,
};
use crate::service::{audit_service::AuditRecorder, session_service};

/// Confirmation literal required by the delete-all-users operation.
pub const DELETE_ALL_CONFIRMATION: &str = "DELETE_ALL_USERS";

// =============================================================================
// SERVICE STRUCT
// =============================================================================

/// Authentication service with business logic for user operations.
///
/// # Thread Safety
///
/// `AuthService` is `Send + Sync` and shared across workers; repositories
/// hold `Arc`-based pools and the codec/hasher are immutable after startup.
#[derive(Clone)]
pub struct AuthService {
    /// Repository for user rows
    users: UserRepository,
    /// Repository for session rows
    sessions: SessionRepository,
    /// Repository for the refresh credential index
    refresh_tokens: RefreshTokenRepository,
    /// Codec for access/refresh tokens
    codec: Arc<TokenCodec>,
    /// bcrypt hasher
    password_hasher: Arc<PasswordHasher>,
    /// Append-only audit trail
    audit: AuditRecorder,
    /// Client for the email service
    email_client: EmailClient,
}

/// Response returned after successful authentication.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Access and refresh tokens
    #[serde(skip)]
    pub tokens: TokenPair,
    /// User summary (safe for clients)
    pub user: UserSummary,
}

impl AuthService {
    /// Creates a new authentication service instance.
    pub fn new(
        users: UserRepository,
        sessions: SessionRepository,
        refresh_tokens: RefreshTokenRepository,
        codec: Arc<TokenCodec>,
        password_hasher: Arc<PasswordHasher>,
        audit: AuditRecorder,
        email_client: EmailClient,
    ) -> Self {
        Self { users, sessions, refresh_tokens, codec, password_hasher, audit, email_client }
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Registers a new user account.
    ///
    /// # Process
    ///
    /// 1. Reject an already-registered email
    /// 2. Hash the password with bcrypt
    /// 3. Create the user (`email_verified = false`, `token_version = 0`)
    /// 4. Dispatch the verification email in the background - a send failure
    ///    is logged but never rolls back the registration
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Option<Role>,
        ctx: &RequestContext,
    ) -> Result<UserSummary, ApiError> {
        let email = normalize_email(email);

        if self.users.email_exists(&email).await? {
            return Err(ApiError::Conflict { resource: "email already registered".to_string() });
        }

        let password_hash = self.password_hasher.hash(password)?;

        let user = self
            .users
            .create(NewUser {
                email: email.clone(),
                password_hash,
                role: role.unwrap_or(Role::User).as_str().to_string(),
                email_verified: false,
            })
            .await?;

        info!(user_id = %user.id, email = %email, "User registered");

        self.audit
            .record(
                NewAuditLog::of(AuditAction::UserRegister, user.id)
                    .with_metadata(serde_json::json!({ "email": email }))
                    .with_context(ctx),
            )
            .await;

        // Fire-and-forget: the account exists whether or not the mail lands.
        let client = self.email_client.clone();
        let user_id = user.id;
        let address = user.email.clone();
        tokio::spawn(async move {
            if let Err(e) = client.send_verification(user_id, &address).await {
                warn!(user_id = %user_id, error = %e, "Verification email dispatch failed");
            }
        });

        Ok(user.into())
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    /// Authenticates a user with email and password.
    ///
    /// # State Machine
    ///
    /// 1. Unknown user → `NotFound`
    /// 2. Unverified email → `EmailNotVerified`
    /// 3. Active lock → `AccountLocked`; expired lock → clear and continue
    /// 4. Wrong password → count the failure; the fifth locks for 30 min
    /// 5. Match → reset counters, stamp login, mint tokens, create session
    ///
    /// The whole machine runs in one transaction holding the user row lock,
    /// so concurrent attempts serialize on steps 3-5.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<AuthResponse, ApiError> {
        let email = normalize_email(email);
        let now = chrono::Utc::now();

        let mut tx = self.users.begin().await?;

        let mut user = match self.users.find_by_email_for_update(&mut *tx, &email).await? {
            Some(user) => user,
            None => {
                drop(tx);
                warn!(email = %email, "Login attempt for unknown email");
                self.audit
                    .record(
                        NewAuditLog::failure(AuditAction::LoginFailed, None, "user not found")
                            .with_metadata(serde_json::json!({ "email": email }))
                            .with_context(ctx),
                    )
                    .await;
                return Err(ApiError::NotFound { resource: "user".to_string() });
            }
        };

        if !user.email_verified {
            drop(tx);
            self.audit
                .record(
                    NewAuditLog::failure(
                        AuditAction::LoginFailed,
                        Some(user.id),
                        "email not verified",
                    )
                    .with_context(ctx),
                )
                .await;
            return Err(ApiError::EmailNotVerified);
        }

        if let Some(until) = user.locked_until(now) {
            drop(tx);
            self.audit
                .record(
                    NewAuditLog::failure(AuditAction::LoginFailed, Some(user.id), "account locked")
                        .with_metadata(serde_json::json!({ "lockedUntil": until }))
                        .with_context(ctx),
                )
                .await;
            return Err(ApiError::AccountLocked { until });
        }

        if lockout::is_expired_lock(user.account_locked_until, now) {
            self.users.clear_lockout(&mut *tx, user.id).await?;
            user.failed_login_attempts = 0;
            user.account_locked_until = None;
            self.audit
                .record_tx(
                    &mut *tx,
                    NewAuditLog::of(AuditAction::AccountUnlocked, user.id).with_context(ctx),
                )
                .await;
        }

        let valid = self.password_hasher.verify(password, &user.password_hash)?;

        if !valid {
            let outcome = lockout::register_failure(user.failed_login_attempts, now);
            self.users
                .record_login_failure(
                    &mut *tx,
                    user.id,
                    outcome.attempts,
                    outcome.locked_until.map(|l| l.0),
                )
                .await?;

            if let Some(lockout::LockedUntil(until)) = outcome.locked_until {
                self.audit
                    .record_tx(
                        &mut *tx,
                        NewAuditLog::of(AuditAction::AccountLocked, user.id)
                            .with_metadata(serde_json::json!({
                                "lockedUntil": until,
                                "failedAttempts": outcome.attempts,
                            }))
                            .with_context(ctx),
                    )
                    .await;
                tx.commit().await?;

                warn!(user_id = %user.id, attempts = outcome.attempts, "Account locked");
                return Err(ApiError::AccountLocked { until });
            }

            self.audit
                .record_tx(
                    &mut *tx,
                    NewAuditLog::failure(
                        AuditAction::LoginFailed,
                        Some(user.id),
                        "invalid password",
                    )
                    .with_metadata(serde_json::json!({ "failedAttempts": outcome.attempts }))
                    .with_context(ctx),
                )
                .await;
            tx.commit().await?;

            return Err(ApiError::InvalidCredentials);
        }

        // Credentials valid: reset counters, stamp the login, issue tokens.
        self.users
            .record_login_success(&mut *tx, user.id, ctx.ip_address.as_deref())
            .await?;

        let pair = self.issue_session(&mut tx, &user, ctx).await?;

        self.audit
            .record_tx(&mut *tx, NewAuditLog::of(AuditAction::UserLogin, user.id).with_context(ctx))
            .await;

        tx.commit().await?;

        info!(user_id = %user.id, "User logged in");

        user.failed_login_attempts = 0;
        user.account_locked_until = None;
        user.last_login_at = Some(now);
        user.last_login_ip = ctx.ip_address.clone();

        Ok(AuthResponse { tokens: pair, user: user.into() })
    }

    // =========================================================================
    // TOKEN REFRESH
    // =========================================================================

    /// Exchanges a refresh token for a new pair (**rotation**).
    ///
    /// After a successful call the old token is gone: exactly one active
    /// session remains for this login and its refresh token is the newly
    /// issued one. Replaying the old token reports it unknown.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<AuthResponse, ApiError> {
        let now = chrono::Utc::now();
        let mut tx = self.users.begin().await?;

        let record = self
            .refresh_tokens
            .find_for_update(&mut *tx, refresh_token)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if record.expires_at < now {
            // Expired credential: clean up eagerly, then reject.
            self.refresh_tokens.delete_by_token_tx(&mut *tx, refresh_token).await?;
            self.sessions.deactivate_by_token(&mut *tx, refresh_token).await?;
            tx.commit().await?;
            return Err(ApiError::TokenExpired);
        }

        let user = self
            .users
            .find_by_id_for_update(&mut *tx, record.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        // Signature check, then the epoch check against the stored user.
        let claims = self.codec.verify_refresh(refresh_token)?;
        if claims.token_version != user.token_version {
            // Hard invalidation: the credential predates an epoch bump.
            self.refresh_tokens.delete_by_token_tx(&mut *tx, refresh_token).await?;
            self.sessions.deactivate_by_token(&mut *tx, refresh_token).await?;
            tx.commit().await?;

            warn!(user_id = %user.id, "Refresh token from a previous epoch rejected");
            return Err(ApiError::TokenInvalidated);
        }

        // Rotate: retire the old credential and session, issue successors.
        self.refresh_tokens.delete_by_token_tx(&mut *tx, refresh_token).await?;
        self.sessions.deactivate_by_token(&mut *tx, refresh_token).await?;

        let pair = self.issue_session(&mut tx, &user, ctx).await?;

        self.audit
            .record_tx(
                &mut *tx,
                NewAuditLog::of(AuditAction::TokenRefreshed, user.id).with_context(ctx),
            )
            .await;

        tx.commit().await?;

        info!(user_id = %user.id, "Refresh token rotated");

        Ok(AuthResponse { tokens: pair, user: user.into() })
    }

    // =========================================================================
    // LOGOUT
    // =========================================================================

    /// Ends the session carrying the given refresh token.
    ///
    /// Idempotent: a missing cookie or an unknown token still succeeds.
    pub async fn logout(
        &self,
        refresh_token: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<(), ApiError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        let mut tx = self.users.begin().await?;
        let record = self.refresh_tokens.find_for_update(&mut *tx, token).await?;
        self.refresh_tokens.delete_by_token_tx(&mut *tx, token).await?;
        self.sessions.deactivate_by_token(&mut *tx, token).await?;

        if let Some(record) = &record {
            self.audit
                .record_tx(
                    &mut *tx,
                    NewAuditLog::of(AuditAction::UserLogout, record.user_id).with_context(ctx),
                )
                .await;
        }
        tx.commit().await?;

        if let Some(record) = record {
            info!(user_id = %record.user_id, "User logged out");
        }

        Ok(())
    }

    // =========================================================================
    // ACCESS-TOKEN VERIFICATION
    // =========================================================================

    /// Verifies a bearer access token for a protected endpoint.
    ///
    /// # Contract
    ///
    /// 1. Verify the signature and expiry
    /// 2. Load the user; missing → `NotFound`
    /// 3. Assert `claims.token_version == user.token_version`; a mismatch is
    ///    a hard invalidation surfaced as "please log in again"
    pub async fn verify_access_token(&self, token: &str) -> Result<AuthenticatedUser, ApiError> {
        let claims = self.codec.verify_access(token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        if claims.token_version != user.token_version {
            return Err(ApiError::TokenInvalidated);
        }

        Ok(AuthenticatedUser { user_id: user.id, role: user.parsed_role() })
    }

    // =========================================================================
    // PROFILE
    // =========================================================================

    /// Gets the authenticated user's profile.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserSummary, ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        Ok(user.into())
    }

    // =========================================================================
    // ADMIN OPERATIONS
    // =========================================================================

    /// Lists all users (admin).
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ApiError> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    /// Changes a user's role (admin). Self-change is rejected.
    pub async fn change_role(
        &self,
        target_user_id: Uuid,
        new_role: Role,
        admin: &AuthenticatedUser,
        ctx: &RequestContext,
    ) -> Result<UserSummary, ApiError> {
        if target_user_id == admin.user_id {
            return Err(ApiError::BadRequest {
                message: "cannot change your own role".to_string(),
            });
        }

        let before = self
            .users
            .find_by_id(target_user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", target_user_id) })?;

        let updated = self.users.update_role(target_user_id, new_role.as_str()).await?;

        info!(
            user_id = %target_user_id,
            old_role = %before.role,
            new_role = %new_role,
            "Role changed"
        );

        self.audit
            .record(
                NewAuditLog::of(AuditAction::RoleChanged, target_user_id)
                    .by(admin.user_id)
                    .with_metadata(serde_json::json!({
                        "oldRole": before.role,
                        "newRole": new_role.as_str(),
                    }))
                    .with_context(ctx),
            )
            .await;

        Ok(updated.into())
    }

    /// Deletes a user and all dependents (admin). Self-deletion is rejected.
    pub async fn delete_user(
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

        self.users.delete(target_user_id).await?;

        self.audit
            .record(
                NewAuditLog::of(AuditAction::UserDeleted, target_user_id)
                    .by(admin.user_id)
                    .with_context(ctx),
            )
            .await;

        info!(user_id = %target_user_id, admin_id = %admin.user_id, "User deleted");

        Ok(())
    }

    /// Deletes every non-admin user (admin). Returns the count.
    pub async fn delete_all_non_admins(
        &self,
        admin: &AuthenticatedUser,
        ctx: &RequestContext,
    ) -> Result<u64, ApiError> {
        let count = self.users.delete_all_non_admins().await?;

        self.audit
            .record(
                NewAuditLog::of(AuditAction::UsersBulkDeleted, admin.user_id)
                    .by(admin.user_id)
                    .with_metadata(serde_json::json!({ "count": count, "scope": "non-admins" }))
                    .with_context(ctx),
            )
            .await;

        warn!(count, admin_id = %admin.user_id, "Bulk-deleted non-admin users");

        Ok(count)
    }

    /// Deletes every user except the caller (admin).
    ///
    /// Requires the client-supplied confirmation literal
    /// [`DELETE_ALL_CONFIRMATION`]; the caller's own row is always excluded.
    pub async fn delete_all_users(
        &self,
        confirmation: &str,
        admin: &AuthenticatedUser,
        ctx: &RequestContext,
    ) -> Result<u64, ApiError> {
        if confirmation != DELETE_ALL_CONFIRMATION {
            return Err(ApiError::BadRequest {
                message: format!("confirmation must be \"{}\"", DELETE_ALL_CONFIRMATION),
            });
        }

        let count = self.users.delete_all_except(admin.user_id).await?;

        self.audit
            .record(
                NewAuditLog::of(AuditAction::UsersBulkDeleted, admin.user_id)
                    .by(admin.user_id)
                    .with_metadata(serde_json::json!({ "count": count, "scope": "all" }))
                    .with_context(ctx),
            )
            .await;

        warn!(count, admin_id = %admin.user_id, "Bulk-deleted all users");

        Ok(count)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Mints a token pair and persists the refresh credential + session.
    ///
    /// Runs on the caller's transaction so the login either fully lands or
    /// leaves no trace.
    async fn issue_session(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        user: &User,
        ctx: &RequestContext,
    ) -> Result<TokenPair, ApiError> {
        let pair = self.codec.generate_pair(user.id, &user.role, user.token_version)?;

        self.refresh_tokens
            .insert(&mut *tx, user.id, &pair.refresh_token, pair.refresh_expires_at)
            .await?;

        let new_session = session_service::build_session(user.id, &pair, ctx);
        self.sessions.create(&mut *tx, new_session).await?;

        Ok(pair)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_all_confirmation_literal() {
        assert_eq!(DELETE_ALL_CONFIRMATION, "DELETE_ALL_USERS");
    }

    #[test]
    fn test_auth_response_never_serializes_tokens() {
        // The token pair reaches the client through the handler (body +
        // cookie), never through a serialized AuthResponse.
        let response = AuthResponse {
            tokens: TokenPair {
                access_token: "access-jwt".to_string(),
                refresh_token: "refresh-jwt".to_string(),
                expires_in: 900,
                refresh_expires_at: chrono::Utc::now(),
            },
            user: UserSummary {
                id: Uuid::new_v4(),
                email: "a@example.com".to_string(),
                role: "USER".to_string(),
                email_verified: true,
                last_login_at: None,
                created_at: chrono::Utc::now(),
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("refresh-jwt"));
        assert!(!json.contains("access-jwt"));
        assert!(json.contains("a@example.com"));
    }
}
