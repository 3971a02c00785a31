//! # Route Configuration
//!
//! URL patterns for the auth service.
//!
//! ## Route Structure
//!
//! ```text
//! /
//! ├── health                                GET    → health_check
//! │
//! └── auth/
//!     ├── register                          POST   → register
//!     ├── login                             POST   → login
//!     ├── refresh                           POST   → refresh (cookie)
//!     ├── logout                            POST   → logout (cookie)
//!     ├── profile                           GET    → get_profile
//!     ├── magic-link/request                POST   → magic_link_request
//!     ├── magic-link/verify                 POST   → magic_link_verify
//!     ├── sessions                          GET    → list_sessions
//!     ├── sessions/{id}                     DELETE → revoke_session
//!     ├── sessions/logout-other-devices     POST   → logout_other_devices
//!     ├── sessions/logout-all-devices       POST   → logout_all_devices
//!     ├── audit/me                          GET    → my_audit_logs
//!     ├── gdpr/export                       GET    → export_data
//!     ├── gdpr/anonymize                    POST   → anonymize
//!     ├── gdpr/update-email                 PATCH  → update_email
//!     ├── admin/users                       GET    → list_users
//!     ├── admin/users                       DELETE → delete_all_non_admins
//!     ├── admin/users/delete-all            POST   → delete_all_users
//!     ├── admin/users/{id}                  DELETE → delete_user
//!     ├── admin/users/{id}/role             PATCH  → change_role
//!     ├── admin/users/{id}/permanent        DELETE → permanent_delete_user
//!     ├── admin/audit                       GET    → query_audit
//!     └── internal/audit-log                POST   → internal_audit_log
//! ```
//!
//! ## Authentication
//!
//! - **Public**: register, login, refresh/logout (cookie), magic link
//! - **Bearer**: profile, sessions, audit/me, gdpr/*
//! - **Bearer + ADMIN**: admin/*
//! - **Shared secret / private network**: internal/audit-log

use actix_web::web;

use super::{admin_handlers, gdpr_handlers, handlers, session_handlers};

/// Configures all routes for the auth service.
///
/// Called from `main.rs` during app initialization:
///
/// ```rust,ignore
/// App::new().configure(routes::configure)
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check)).service(
        web::scope("/auth")
            // ─────────────────────────────────────────────────────────
            // Credential + token endpoints
            // ─────────────────────────────────────────────────────────
            .route("/register", web::post().to(handlers::register))
            .route("/login", web::post().to(handlers::login))
            .route("/refresh", web::post().to(handlers::refresh))
            .route("/logout", web::post().to(handlers::logout))
            .route("/profile", web::get().to(handlers::get_profile))
            // ─────────────────────────────────────────────────────────
            // Magic link (passwordless login + silent signup)
            // ─────────────────────────────────────────────────────────
            .route("/magic-link/request", web::post().to(handlers::magic_link_request))
            .route("/magic-link/verify", web::post().to(handlers::magic_link_verify))
            // ─────────────────────────────────────────────────────────
            // Session management
            // ─────────────────────────────────────────────────────────
            // Fixed paths registered before the {id} capture.
            .route(
                "/sessions/logout-other-devices",
                web::post().to(session_handlers::logout_other_devices),
            )
            .route(
                "/sessions/logout-all-devices",
                web::post().to(session_handlers::logout_all_devices),
            )
            .route("/sessions", web::get().to(session_handlers::list_sessions))
            .route("/sessions/{id}", web::delete().to(session_handlers::revoke_session))
            // ─────────────────────────────────────────────────────────
            // Self-service audit + GDPR
            // ─────────────────────────────────────────────────────────
            .route("/audit/me", web::get().to(gdpr_handlers::my_audit_logs))
            .route("/gdpr/export", web::get().to(gdpr_handlers::export_data))
            .route("/gdpr/anonymize", web::post().to(gdpr_handlers::anonymize))
            .route("/gdpr/update-email", web::patch().to(gdpr_handlers::update_email))
            // ─────────────────────────────────────────────────────────
            // Admin
            // ─────────────────────────────────────────────────────────
            .route("/admin/users", web::get().to(admin_handlers::list_users))
            .route("/admin/users", web::delete().to(admin_handlers::delete_all_non_admins))
            .route("/admin/users/delete-all", web::post().to(admin_handlers::delete_all_users))
            .route("/admin/users/{id}", web::delete().to(admin_handlers::delete_user))
            .route("/admin/users/{id}/role", web::patch().to(admin_handlers::change_role))
            .route(
                "/admin/users/{id}/permanent",
                web::delete().to(admin_handlers::permanent_delete_user),
            )
            .route("/admin/audit", web::get().to(admin_handlers::query_audit))
            // ─────────────────────────────────────────────────────────
            // Internal (email service → auth service)
            // ─────────────────────────────────────────────────────────
            .route("/internal/audit-log", web::post().to(admin_handlers::internal_audit_log)),
    );
}
