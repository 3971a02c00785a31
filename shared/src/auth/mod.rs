//! # Authentication and Authorization Module
//!
//! Token codecs, password hashing, and request authentication primitives
//! shared by both Gatehouse services.
//!
//! ## Module Structure
//!
//! ```text
//! auth/
//! ├── jwt.rs        - Access/refresh and out-of-band token codecs
//! ├── password.rs   - bcrypt password hashing
//! └── middleware.rs - Bearer extraction, roles, authenticated caller
//! ```
//!
//! ## Overview
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`TokenCodec`] | Sign/verify access and refresh JWTs (independent secrets) |
//! | [`EmailTokenCodec`] | Sign/verify verification / reset / magic-link tokens |
//! | [`PasswordHasher`] | bcrypt hashing (cost 12) |
//! | [`Role`] / [`AuthenticatedUser`] | Authorization model |
//!
//! ## Token Flow
//!
//! ```text
//! ┌────────┐        ┌────────────┐        ┌────────────┐
//! │ Client │        │ Auth API   │        │ Protected  │
//! └───┬────┘        └─────┬──────┘        │    API     │
//!     │                   │               └─────┬──────┘
//!     │ POST /auth/login  │                     │
//!     │──────────────────>│                     │
//!     │ {accessToken}     │                     │
//!     │ + jid cookie      │                     │
//!     │<──────────────────│                     │
//!     │                   │                     │
//!     │ GET /auth/profile (Bearer access)       │
//!     │────────────────────────────────────────>│
//!     │                   │  verify signature   │
//!     │                   │  + token_version    │
//!     │ 200 OK {user}     │                     │
//!     │<────────────────────────────────────────│
//!     │                   │                     │
//!     │ (after 15 min)    │                     │
//!     │ POST /auth/refresh (cookie)             │
//!     │──────────────────>│  rotate refresh     │
//!     │ {accessToken}     │  token + session    │
//!     │<──────────────────│                     │
//! ```

pub mod jwt;
pub mod middleware;
pub mod password;

// Re-export main types for convenient access
pub use jwt::{Claims, EmailClaims, EmailTokenCodec, OobTokenKind, TokenCodec, TokenPair};
pub use middleware::{bearer_token, AuthenticatedUser, Role};
pub use password::{PasswordHasher, PasswordValidator};
