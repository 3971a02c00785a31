//! # Gatehouse - Email Service
//!
//! The **email-service** owns outbound transactional delivery and the
//! stateful tokens backing the out-of-band flows: email verification,
//! password reset, and magic-link delivery.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  EmailFlowService │ MailSender (lettre) │ templates │ sweeper   │
//! └──────────┬─────────────────────┬────────────────────────────────┘
//!            ▼                     ▼
//! ┌────────────────────┐  ┌───────────────────────────────┐
//! │ PostgreSQL (shared │  │ SMTP relay (20 s timeout)     │
//! │ with auth-service) │  └───────────────────────────────┘
//! └────────────────────┘
//! ```
//!
//! Audit rows are relayed to the auth service's internal endpoint; the
//! relay is fire-and-forget and never fails a delivered email.
//!
//! ## The Reset Epoch
//!
//! `POST /email/reset-password` is the platform's global invalidation
//! point: in one transaction it re-hashes the credential, clears lockout
//! state, bumps `users.token_version`, deletes every refresh token, and
//! deactivates every session. The auth service's per-request epoch check
//! does the rest.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use shared::{
    auth::{EmailTokenCodec, PasswordHasher},
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
use clients::AuditClient;
use repository::{PasswordResetTokenRepository, UserRepository, VerificationTokenRepository};
use service::{sweeper, EmailFlowService, MailSender};

/// Shared application state injected into all request handlers.
pub struct AppState {
    /// Verification / reset flows and magic-link dispatch
    pub email_flow: EmailFlowService,
}

/// Application entry point and server initialization.
///
/// Fail-fast on configuration and pool errors; the SMTP connectivity check
/// logs its outcome but never aborts startup.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // ─────────────────────────────────────────────────────────────────────
    // Step 1: Configuration and logging
    // ─────────────────────────────────────────────────────────────────────
    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing_config::init_tracing("email-service", config.is_production());

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting email-service"
    );

    // ─────────────────────────────────────────────────────────────────────
    // Step 2: Database pool (shared store with the auth service)
    // ─────────────────────────────────────────────────────────────────────
    let db_pool = database::create_pool(&config.database)
        .await
        .expect("Failed to create database pool");

    // ─────────────────────────────────────────────────────────────────────
    // Step 3: SMTP transport, codec, clients
    // ─────────────────────────────────────────────────────────────────────
    let mailer = MailSender::new(config.smtp.clone()).expect("Failed to build SMTP transport");
    // Logged either way; a dead relay must not prevent startup.
    mailer.verify_connectivity().await;

    let email_codec = Arc::new(EmailTokenCodec::new(
        config.email_tokens.clone(),
        config.jwt.issuer.clone(),
    ));
    let password_hasher = Arc::new(PasswordHasher::new());

    let audit = AuditClient::new(
        config.services.auth_service_url.clone(),
        config.services.internal_shared_secret.clone(),
    )
    .expect("Failed to build audit client");

    // ─────────────────────────────────────────────────────────────────────
    // Step 4: Repositories and the flow service
    // ─────────────────────────────────────────────────────────────────────
    let users = UserRepository::new(db_pool.clone());
    let verification_tokens = VerificationTokenRepository::new(db_pool.clone());
    let reset_tokens = PasswordResetTokenRepository::new(db_pool.clone());

    let email_flow = EmailFlowService::new(
        users,
        verification_tokens.clone(),
        reset_tokens.clone(),
        email_codec,
        password_hasher,
        mailer,
        audit,
        config.services.client_url.clone(),
    );

    // ─────────────────────────────────────────────────────────────────────
    // Step 5: Background sweeper
    // ─────────────────────────────────────────────────────────────────────
    sweeper::spawn_token_sweeper(verification_tokens, reset_tokens);

    let app_state = web::Data::new(AppState { email_flow });
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
