//! # Route Configuration
//!
//! ```text
//! /
//! ├── health                       GET  → health_check
//! │
//! └── email/
//!     ├── send-verification        POST → send_verification   (auth svc)
//!     ├── verify-email             POST → verify_email
//!     ├── resend-verification      POST → resend_verification
//!     ├── forgot-password          POST → forgot_password
//!     ├── reset-password           POST → reset_password
//!     └── send-magic-link          POST → send_magic_link     (auth svc)
//! ```
//!
//! Inter-service routes carry no auth header; the deployment keeps this
//! service reachable only on the private network.

use actix_web::web;

use super::handlers;

/// Configures all routes for the email service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check)).service(
        web::scope("/email")
            .route("/send-verification", web::post().to(handlers::send_verification))
            .route("/verify-email", web::post().to(handlers::verify_email))
            .route("/resend-verification", web::post().to(handlers::resend_verification))
            .route("/forgot-password", web::post().to(handlers::forgot_password))
            .route("/reset-password", web::post().to(handlers::reset_password))
            .route("/send-magic-link", web::post().to(handlers::send_magic_link)),
    );
}
