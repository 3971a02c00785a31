//! # Repository Layer
//!
//! Data access abstractions for the auth domain. Each repository owns one
//! table's SQL; the service layer composes them, opening a transaction for
//! any transition that touches more than one row.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Service Layer                                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UserRepository │ SessionRepository │ RefreshTokenRepository            │
//! │  MagicLinkRepository │ AuditLogRepository                               │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │ sqlx queries
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   users │ sessions │ refresh_tokens │ magic_link_tokens │ audit_logs    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Concrete structs**: repositories are plain structs over `PgPool`,
//!    cloned freely (the pool is `Arc`-based).
//! 2. **`_tx`-style methods**: the serializable flows (login + lockout,
//!    rotation, magic redemption, password reset) pass a
//!    `&mut PgConnection` borrowed from one transaction; `FOR UPDATE` row
//!    locks serialize racing attempts.
//! 3. **Unique constraints live in the store**: email and token uniqueness
//!    surface as `Conflict`, never as read-then-write races.

pub mod audit_repository;
pub mod magic_link_repository;
pub mod refresh_token_repository;
pub mod session_repository;
pub mod user_repository;

pub use audit_repository::AuditLogRepository;
pub use magic_link_repository::MagicLinkRepository;
pub use refresh_token_repository::RefreshTokenRepository;
pub use session_repository::SessionRepository;
pub use user_repository::UserRepository;
