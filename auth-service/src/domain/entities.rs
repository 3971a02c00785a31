//! # Authentication Domain Entities
//!
//! Core domain entities for the identity platform. Entities represent
//! persistent business objects that map directly to database tables.
//!
//! ## Entity Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Entities                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────┐ 1:N    ┌────────────────────────┐             │
//! │  │        User         │───────▶│        Session          │             │
//! │  ├─────────────────────┤        ├────────────────────────┤             │
//! │  │ - id (PK)           │        │ - id (PK)              │             │
//! │  │ - email (unique)    │        │ - user_id (FK)         │             │
//! │  │ - password_hash     │        │ - refresh_token (uniq) │             │
//! │  │ - role              │        │ - device / ip context  │             │
//! │  │ - email_verified    │        │ - is_active            │             │
//! │  │ - failed_attempts   │        │ - expires_at           │             │
//! │  │ - locked_until      │        └────────────────────────┘             │
//! │  │ - token_version     │                                               │
//! │  └─────────┬───────────┘ 1:N    ┌────────────────────────┐             │
//! │            ├───────────────────▶│      RefreshToken       │             │
//! │            │                    │  (bare credential idx)  │             │
//! │            │ 1:N                └────────────────────────┘             │
//! │            └───────────────────▶┌────────────────────────┐             │
//! │                                 │     MagicLinkToken      │             │
//! │                                 │  (one-shot credential)  │             │
//! │                                 └────────────────────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Invariants
//!
//! - `token_version` never decreases; bumping it invalidates every issued JWT
//! - `email_verified` only reverts to false when the address itself changes
//! - `failed_login_attempts` resets on successful credential validation and
//!   on lock expiry
//! - `(user_id, refresh_token)` uniquely identifies a session; an inactive
//!   session can never refresh
//!
//! ## Security Considerations
//!
//! - **Never expose `password_hash`**: use [`UserSummary`] for API responses
//! - **Sessions never expose the raw refresh token** in listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::auth::Role;
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// USER ENTITY
// =============================================================================

/// Complete user entity as stored in the database.
///
/// Maps directly to the `users` table and contains sensitive fields.
/// **Never expose this struct in API responses** - use [`UserSummary`].
///
/// # Fields
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | `id` | UUID | Primary key |
/// | `email` | String | Unique, case-folded to lowercase |
/// | `password_hash` | String | bcrypt hash (cost >= 10) |
/// | `role` | String | "USER" or "ADMIN" |
/// | `email_verified` | bool | Whether the address is proven |
/// | `failed_login_attempts` | i32 | Sliding lockout counter |
/// | `account_locked_until` | Option | Lock release instant |
/// | `token_version` | i32 | Monotonic epoch for JWT invalidation |
/// | `last_login_at` / `last_login_ip` | - | Last successful login |
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: Uuid,
    /// Email address (unique, lowercase)
    pub email: String,
    /// bcrypt password hash. For magic-link signups this is an unguessable
    /// random credential the user never receives.
    pub password_hash: String,
    /// Role: "USER" or "ADMIN"
    pub role: String,
    /// Whether the email address has been verified
    pub email_verified: bool,
    /// Consecutive failed password attempts since the last success
    pub failed_login_attempts: i32,
    /// If set and in the future, logins are refused until this instant
    pub account_locked_until: Option<DateTime<Utc>>,
    /// Monotonically non-decreasing epoch embedded in every issued JWT
    pub token_version: i32,
    /// Timestamp of last successful login
    pub last_login_at: Option<DateTime<Utc>>,
    /// IP address of last successful login
    pub last_login_ip: Option<String>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the parsed role, defaulting to USER for unknown values.
    pub fn parsed_role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::User)
    }

    /// Returns the lock release time if the account is locked at `now`.
    pub fn locked_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.account_locked_until.filter(|until| *until > now)
    }
}

// =============================================================================
// USER SUMMARY (SAFE FOR API RESPONSES)
// =============================================================================

/// Public user projection without sensitive data.
///
/// Excludes `password_hash` and the lockout bookkeeping columns.
///
/// # JSON Serialization
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "user@example.com",
///   "role": "USER",
///   "emailVerified": true,
///   "lastLoginAt": "2024-01-15T10:30:00Z",
///   "createdAt": "2024-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Unique user identifier
    pub id: Uuid,
    /// User's email address
    pub email: String,
    /// User role
    pub role: String,
    /// Email verification status
    pub email_verified: bool,
    /// Last login timestamp
    pub last_login_at: Option<DateTime<Utc>>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    /// Strips sensitive fields, making the result safe for API responses.
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            email_verified: user.email_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Data required to create a new user.
///
/// The password must already be hashed - never store plain credentials.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address (must be unique, already lowercased)
    pub email: String,
    /// Pre-hashed password (bcrypt)
    pub password_hash: String,
    /// Role ("USER" unless explicitly elevated)
    pub role: String,
    /// Initial verification state (false except where possession of the
    /// address has already been proven)
    pub email_verified: bool,
}

// =============================================================================
// SESSION
// =============================================================================

/// One row per active refresh-token-bearing login.
///
/// The session is the unit of revocation: rotating its refresh token,
/// logging out, resetting the password, or an explicit revoke all flip
/// `is_active = false` (or replace the row).
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// The exact refresh token string (also indexed in `refresh_tokens`)
    pub refresh_token: String,
    /// Parsed device name, e.g. "iPhone"
    pub device_name: Option<String>,
    /// Parsed device class: "mobile" / "tablet" / "desktop"
    pub device_type: Option<String>,
    /// Parsed browser family
    pub browser: Option<String>,
    /// Parsed operating system
    pub os: Option<String>,
    /// Client IP at creation
    pub ip_address: Option<String>,
    /// Geo country, when resolved by the edge
    pub country: Option<String>,
    /// Geo city, when resolved by the edge
    pub city: Option<String>,
    /// An inactive session MUST NOT be usable to refresh
    pub is_active: bool,
    /// Last time this session touched the API
    pub last_activity_at: DateTime<Utc>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Mirror of the refresh token's expiry
    pub expires_at: DateTime<Utc>,
}

/// Data required to create a new session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owning user
    pub user_id: Uuid,
    /// The refresh token issued alongside this session
    pub refresh_token: String,
    /// Parsed device name
    pub device_name: Option<String>,
    /// Parsed device class
    pub device_type: Option<String>,
    /// Parsed browser family
    pub browser: Option<String>,
    /// Parsed operating system
    pub os: Option<String>,
    /// Client IP
    pub ip_address: Option<String>,
    /// Session expiry (refresh token expiry)
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// REFRESH TOKEN
// =============================================================================

/// The bare refresh credential index.
///
/// Exists alongside [`Session`] for fast lookup by exact token value and to
/// allow cleanup independent of session metadata.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    /// Unique record identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// The exact refresh token string (unique)
    pub token: String,
    /// When this credential expires
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// MAGIC LINK TOKEN
// =============================================================================

/// One-shot passwordless login credential.
///
/// Consumed by flipping `used = true` (the row is retained for audit until
/// the sweeper removes it 7 days after use).
#[derive(Debug, Clone, FromRow)]
pub struct MagicLinkToken {
    /// Unique token identifier
    pub id: Uuid,
    /// The signed token string (unique)
    pub token: String,
    /// The user this token authenticates
    pub user_id: Uuid,
    /// One-shot marker
    pub used: bool,
    /// When the token was redeemed
    pub used_at: Option<DateTime<Utc>>,
    /// IP address at redemption
    pub ip_address: Option<String>,
    /// User agent at redemption
    pub user_agent: Option<String>,
    /// Expiry instant (15 min TTL)
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// Client context extracted at the HTTP edge and threaded through services.
///
/// Identity never rides on mutated request state; handlers build this value
/// explicitly and pass it down.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Client IP: `X-Forwarded-For[0]`, then `X-Real-IP`, then the socket
    pub ip_address: Option<String>,
    /// Raw `User-Agent` header
    pub user_agent: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            role: "USER".to_string(),
            email_verified: true,
            failed_login_attempts: 0,
            account_locked_until: None,
            token_version: 0,
            last_login_at: None,
            last_login_ip: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_summary_strips_sensitive_fields() {
        let user = sample_user();
        let email = user.email.clone();
        let summary: UserSummary = user.into();

        assert_eq!(summary.email, email);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("$2b$"));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary: UserSummary = sample_user().into();
        let json = serde_json::to_string(&summary).unwrap();

        assert!(json.contains("emailVerified"));
        assert!(json.contains("createdAt"));
    }

    #[test]
    fn test_parsed_role_defaults_to_user() {
        let mut user = sample_user();
        user.role = "SOMETHING_ELSE".to_string();
        assert_eq!(user.parsed_role(), Role::User);

        user.role = "ADMIN".to_string();
        assert_eq!(user.parsed_role(), Role::Admin);
    }

    #[test]
    fn test_locked_until_only_when_in_future() {
        let now = Utc::now();
        let mut user = sample_user();

        assert_eq!(user.locked_until(now), None);

        user.account_locked_until = Some(now - Duration::minutes(1));
        assert_eq!(user.locked_until(now), None);

        let until = now + Duration::minutes(30);
        user.account_locked_until = Some(until);
        assert_eq!(user.locked_until(now), Some(until));
    }
}
