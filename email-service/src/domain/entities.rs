//! # Email Service Domain Entities
//!
//! The out-of-band token rows this service owns, plus the slice of the
//! shared `users` table it reads and mutates.
//!
//! ## Consumption Rules
//!
//! | Token | Table | Consumed by |
//! |-------|-------|-------------|
//! | Verification | `verification_tokens` | row deletion |
//! | Password reset | `password_reset_tokens` | `used = TRUE` (kept for audit) |
//!
//! Only the most recent unused token per user matters; minting purges the
//! predecessors.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// OUT-OF-BAND TOKEN ROWS
// =============================================================================

/// Email verification token.
///
/// Deleted on consumption - a verified address needs no audit row here,
/// the `EMAIL_VERIFIED` audit entry carries the history.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    /// Unique token identifier
    pub id: Uuid,
    /// The signed token string (unique)
    pub token: String,
    /// The user whose address this token proves
    pub user_id: Uuid,
    /// Expiry instant (24 h TTL)
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Password reset token.
///
/// Flips `used = TRUE` on consumption and records the redeeming request's
/// context; retained for audit until the sweeper removes it.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    /// Unique token identifier
    pub id: Uuid,
    /// The signed token string (unique)
    pub token: String,
    /// The user whose password this token resets
    pub user_id: Uuid,
    /// One-shot marker
    pub used: bool,
    /// When the token was consumed
    pub used_at: Option<DateTime<Utc>>,
    /// IP address at consumption
    pub ip_address: Option<String>,
    /// User agent at consumption
    pub user_agent: Option<String>,
    /// Expiry instant (1 h TTL)
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// USER SLICE
// =============================================================================

/// The columns of the shared `users` table this service touches.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    /// Unique identifier
    pub id: Uuid,
    /// Email address (unique, lowercase)
    pub email: String,
    /// Whether the address is proven
    pub email_verified: bool,
    /// Monotonic epoch for JWT invalidation; the reset flow bumps it
    pub token_version: i32,
}

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// Client context forwarded into the reset flow and onto audit rows.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Client IP: `X-Forwarded-For[0]`, then `X-Real-IP`, then the socket
    pub ip_address: Option<String>,
    /// Raw `User-Agent` header
    pub user_agent: Option<String>,
}
