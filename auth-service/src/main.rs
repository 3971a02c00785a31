//! # Gatehouse - Authentication Service
//!
//! The **auth-service** owns the user record, credential verification,
//! session lifecycle, token issuance, the account-locking state machine,
//! role-based access decisions, the audit trail, and the GDPR rights.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! │       routes │ handlers │ DTOs │ context + refresh cookie       │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                     │
//! │  AuthService │ SessionRegistry │ MagicLinkService │ GdprService │
//! │  AuditRecorder │ background sweepers                            │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)                 │
//! │  users │ sessions │ refresh_tokens │ magic_links │ audit_logs   │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          PostgreSQL (shared with the email service)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Token Economy
//!
//! - **Access tokens** (15 min): stateless signature check plus a per-user
//!   `token_version` epoch comparison on every protected request
//! - **Refresh tokens** (7 days): HTTP-only cookie, rotated on every use,
//!   backed by a `refresh_tokens` row and a `sessions` row
//! - **Magic links** (15 min): one-shot, silently create new accounts
//!
//! A password reset bumps the epoch, instantly invalidating every token
//! issued before it.
//!
//! ## Peer Service
//!
//! Outbound mail goes through the email service
//! (`POST {EMAIL_SERVICE_URL}/email/...`); the email service relays its
//! audit rows back through `POST /auth/internal/audit-log`.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use shared::{
    auth::{EmailTokenCodec, PasswordHasher, TokenCodec},
    config::AppConfig,
    database, tracing_config,
};
use std::sync::Arc;
use tracing::info;

mod api;
mod clients;
mod domain;
mod repository;
mod service;

use api::routes;
use clients::EmailClient;
use repository::{
    AuditLogRepository, MagicLinkRepository, RefreshTokenRepository, SessionRepository,
    UserRepository,
};
use service::{
    sweeper, AuditRecorder, AuthService, GdprService, MagicLinkService, SessionRegistry,
};

/// Shared application state injected into all request handlers.
pub struct AppState {
    /// Registration, login, refresh, logout, admin user operations
    pub auth_service: AuthService,
    /// Session listing and revocation
    pub sessions: SessionRegistry,
    /// Passwordless login flow
    pub magic_link_service: MagicLinkService,
    /// Export / anonymize / permanent delete / email change
    pub gdpr: GdprService,
    /// Audit trail recorder and query surface
    pub audit: AuditRecorder,
    /// Name of the refresh-token cookie
    pub cookie_name: String,
    /// Whether production cookie attributes apply
    pub production: bool,
    /// Shared secret for the internal audit-relay endpoint
    pub internal_secret: Option<String>,
}

/// Application entry point and server initialization.
///
/// Fail-fast: configuration or pool errors abort startup with a non-zero
/// exit. Actix handles SIGINT/SIGTERM by draining in-flight requests.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // ─────────────────────────────────────────────────────────────────────
    // Step 1: Configuration and logging
    // ─────────────────────────────────────────────────────────────────────
    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing_config::init_tracing("auth-service", config.is_production());

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting auth-service"
    );

    // ─────────────────────────────────────────────────────────────────────
    // Step 2: Database pool
    // ─────────────────────────────────────────────────────────────────────
    let db_pool = database::create_pool(&config.database)
        .await
        .expect("Failed to create database pool");

    // ─────────────────────────────────────────────────────────────────────
    // Step 3: Codecs, hasher, clients
    // ─────────────────────────────────────────────────────────────────────
    // Secrets are read once here and held immutable for the process life.
    let codec = Arc::new(TokenCodec::new(config.jwt.clone()));
    let email_codec = Arc::new(EmailTokenCodec::new(
        config.email_tokens.clone(),
        config.jwt.issuer.clone(),
    ));
    let password_hasher = Arc::new(PasswordHasher::new());
    let email_client = EmailClient::new(config.services.email_service_url.clone())
        .expect("Failed to build email client");

    // ─────────────────────────────────────────────────────────────────────
    // Step 4: Repositories and services
    // ─────────────────────────────────────────────────────────────────────
    let users = UserRepository::new(db_pool.clone());
    let sessions_repo = SessionRepository::new(db_pool.clone());
    let refresh_tokens = RefreshTokenRepository::new(db_pool.clone());
    let magic_links = MagicLinkRepository::new(db_pool.clone());
    let audit_logs = AuditLogRepository::new(db_pool.clone());

    let audit = AuditRecorder::new(audit_logs.clone());

    let auth_service = AuthService::new(
        users.clone(),
        sessions_repo.clone(),
        refresh_tokens.clone(),
        codec.clone(),
        password_hasher.clone(),
        audit.clone(),
        email_client.clone(),
    );

    let sessions = SessionRegistry::new(sessions_repo.clone(), refresh_tokens.clone(), audit.clone());

    let magic_link_service = MagicLinkService::new(
        users.clone(),
        sessions_repo.clone(),
        refresh_tokens.clone(),
        magic_links.clone(),
        codec.clone(),
        email_codec,
        password_hasher.clone(),
        audit.clone(),
        email_client.clone(),
    );

    let gdpr = GdprService::new(
        users,
        sessions_repo.clone(),
        refresh_tokens.clone(),
        magic_links.clone(),
        audit_logs,
        password_hasher,
        audit.clone(),
        email_client,
    );

    // ─────────────────────────────────────────────────────────────────────
    // Step 5: Background sweepers
    // ─────────────────────────────────────────────────────────────────────
    // The sweepers repair whatever interrupted requests leave behind and
    // enforce audit retention.
    sweeper::spawn_token_sweeper(refresh_tokens, sessions_repo, magic_links);
    sweeper::spawn_audit_sweeper(audit.clone(), config.audit.retention_days);

    let app_state = web::Data::new(AppState {
        auth_service,
        sessions,
        magic_link_service,
        gdpr,
        audit,
        cookie_name: config.http.refresh_cookie_name.clone(),
        production: config.is_production(),
        internal_secret: config.services.internal_shared_secret.clone(),
    });

    let db_pool = web::Data::new(db_pool);

    // ─────────────────────────────────────────────────────────────────────
    // Step 6: HTTP server
    // ─────────────────────────────────────────────────────────────────────
    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let origins = config.http.origins();

    info!("Server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        for origin in &origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .app_data(db_pool.clone())
            .configure(routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
