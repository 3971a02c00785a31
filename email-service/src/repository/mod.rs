//! # Repository Layer
//!
//! Data access for the out-of-band token tables this service owns and for
//! the shared `users` / `refresh_tokens` / `sessions` tables the reset and
//! verification flows mutate.

pub mod token_repository;
pub mod user_repository;

pub use token_repository::{PasswordResetTokenRepository, VerificationTokenRepository};
pub use user_repository::UserRepository;
