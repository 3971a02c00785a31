//! # Service Layer
//!
//! The business logic of the auth service. Each service orchestrates the
//! repositories, the token codecs, and the audit recorder; the API layer
//! above only translates HTTP.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            API Layer                                    │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AuthService        - register / login / refresh / logout / verify     │
//! │  SessionRegistry    - list / revoke / revoke-others / revoke-all       │
//! │  MagicLinkService   - request (silent signup) / redeem                 │
//! │  GdprService        - export / anonymize / permanent delete / email    │
//! │  AuditRecorder      - append-only trail + admin query + retention      │
//! │  sweeper            - background cleanup tasks                         │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │           Repository Layer          │   TokenCodec / PasswordHasher     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Audit Coverage
//!
//! | Operation | Audit action |
//! |---------------------|--------------------------------|
//! | `register` | `USER_REGISTER` |
//! | `login` | `USER_LOGIN` / `LOGIN_FAILED` / `ACCOUNT_LOCKED` / `ACCOUNT_UNLOCKED` |
//! | `refresh` | `TOKEN_REFRESHED` |
//! | `logout` | `USER_LOGOUT` |
//! | session revocation | `SESSION_REVOKED` / `USER_LOGOUT_*_DEVICES` |
//! | magic link | `MAGIC_LINK_REQUESTED/SENT/LOGIN/FAILED` |
//! | admin ops | `ROLE_CHANGED` / `USER_DELETED` / `USERS_BULK_DELETED` |
//! | GDPR | `USER_DATA_EXPORTED/ANONYMIZED` / `USER_PERMANENTLY_DELETED` / `EMAIL_UPDATED` |

pub mod audit_service;
pub mod auth_service;
pub mod gdpr_service;
pub mod magic_link_service;
pub mod session_service;
pub mod sweeper;

pub use audit_service::AuditRecorder;
pub use auth_service::{AuthResponse, AuthService};
pub use gdpr_service::GdprService;
pub use magic_link_service::MagicLinkService;
pub use session_service::SessionRegistry;
