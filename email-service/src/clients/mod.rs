//! # Outbound Clients
//!
//! The audit relay back to the auth service.

pub mod audit_client;

pub use audit_client::{AuditClient, AuditEvent};
