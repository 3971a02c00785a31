//! # API Layer
//!
//! HTTP request/response processing for the auth service.
//!
//! ## Module Organization
//!
//! | Module | Responsibility |
//! |--------------------|-----------------------------------------------------|
//! | `routes` | Route definitions with actix-web's `configure()` |
//! | `handlers` | Credential, token, and magic-link handlers |
//! | `session_handlers` | Session listing and revocation |
//! | `admin_handlers` | User administration, audit query, internal relay |
//! | `gdpr_handlers` | Export, anonymization, email change, own audit |
//! | `dto` | Request/response shapes and validation |
//! | `context` | Client-context extraction and the refresh cookie |
//!
//! ## Handler Pattern
//!
//! Handlers never mutate request state to carry identity: they extract the
//! bearer, ask the auth service to verify it (signature + token epoch), and
//! receive the caller as an explicit `AuthenticatedUser` value.

pub mod admin_handlers;
pub mod context;
pub mod dto;
pub mod gdpr_handlers;
pub mod handlers;
pub mod routes;
pub mod session_handlers;
