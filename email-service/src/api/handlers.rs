//! # Request Handlers
//!
//! HTTP handlers for the email service. Validation first, then the flow
//! service; responses are uniform messages (the flows that resist
//! enumeration return the same body on every path).

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use shared::{errors::ApiError, validation};

use crate::domain::RequestContext;
use crate::AppState;

use super::dto::{
    ForgotPasswordRequest, HealthResponse, MessageResponse, ResendVerificationRequest,
    ResetPasswordRequest, SendMagicLinkRequest, SendVerificationRequest, VerifyEmailRequest,
};

/// Builds the client context from forwarding headers or the socket.
fn request_context(req: &HttpRequest) -> RequestContext {
    let header = |name: &str| {
        req.headers().get(name).and_then(|v| v.to_str().ok()).map(String::from)
    };

    let ip_address = header("X-Forwarded-For")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .or_else(|| header("X-Real-IP"))
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()));

    RequestContext { ip_address, user_agent: header("User-Agent") }
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

/// Health check endpoint.
///
/// # Route
///
/// `GET /health`
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: "email-service".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Mints and dispatches a verification token (auth service → here).
///
/// # Route
///
/// `POST /email/send-verification`
pub async fn send_verification(
    state: web::Data<AppState>,
    body: web::Json<SendVerificationRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.email_flow.send_verification(body.user_id, &body.email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Verification email sent")))
}

/// Consumes a verification token.
///
/// # Route
///
/// `POST /email/verify-email`
///
/// # Responses
///
/// - **200 OK**: address verified
/// - **400 Bad Request**: invalid / expired token, or already verified
pub async fn verify_email(
    state: web::Data<AppState>,
    body: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.email_flow.verify_email(&body.token).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Email verified successfully")))
}

/// Re-sends the verification email for an unverified account.
///
/// # Route
///
/// `POST /email/resend-verification`
pub async fn resend_verification(
    state: web::Data<AppState>,
    body: web::Json<ResendVerificationRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.email_flow.resend_verification(&body.email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Verification email sent")))
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

/// Requests a password reset link.
///
/// # Route
///
/// `POST /email/forgot-password`
///
/// Always 200 with the same body - unknown addresses are indistinguishable.
pub async fn forgot_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let message = state.email_flow.send_password_reset(&body.email, &ctx).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}

/// Applies a password reset.
///
/// # Route
///
/// `POST /email/reset-password`
///
/// # Responses
///
/// - **200 OK**: reset applied; the body states every session is terminated
/// - **400 Bad Request**: invalid / expired / already-used token
pub async fn reset_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let message = state.email_flow.reset_password(&body.token, &body.new_password, &ctx).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}

// =============================================================================
// MAGIC LINK DISPATCH
// =============================================================================

/// Renders and dispatches a magic link (auth service → here).
///
/// # Route
///
/// `POST /email/send-magic-link`
pub async fn send_magic_link(
    state: web::Data<AppState>,
    body: web::Json<SendMagicLinkRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.email_flow.send_magic_link(&body.email, &body.token, body.is_new_user).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Magic link sent")))
}
