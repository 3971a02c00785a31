//! # Outbound Clients
//!
//! HTTP clients for peer services. Built once at startup with fixed
//! timeouts and threaded through service constructors.

pub mod email_client;

pub use email_client::EmailClient;
