//! # Request Handlers - Authentication
//!
//! HTTP handlers for registration, login, refresh, logout, profile, and the
//! magic-link flow. Each handler follows the same pattern:
//!
//! 1. **Extract** request data and client context
//! 2. **Validate** input using the `validator` crate
//! 3. **Call** the service layer
//! 4. **Translate** the result (body + refresh cookie where applicable)
//!
//! ## Cookie Discipline
//!
//! Every handler that issues a refresh token sets it as the HTTP-only
//! cookie; every handler that ends a session clears it. Access tokens ride
//! in the JSON body only.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use shared::{auth::Role, errors::ApiError, validation};

use crate::AppState;

use super::context::{
    clear_refresh_cookie, refresh_cookie, refresh_token_from_cookie, request_context,
};
use super::dto::{
    AccessTokenResponseDto, AuthResponseDto, HealthResponse, LoginRequest, MagicLinkRequest,
    MagicLinkVerifyRequest, MessageResponse, RegisterRequest, RegisterResponseDto,
};

// =============================================================================
// HEALTH CHECK
// =============================================================================

/// Health check endpoint for monitoring and load balancers.
///
/// # Route
///
/// `GET /health`
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: "auth-service".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Registers a new user account.
///
/// # Route
///
/// `POST /auth/register`
///
/// # Responses
///
/// - **201 Created**: `{ "user": { ... } }` - verification email queued
/// - **400 Bad Request**: validation failed
/// - **409 Conflict**: email already registered
pub async fn register(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let role = match body.role.as_deref() {
        None => None,
        Some(raw) => Some(Role::parse(raw).ok_or_else(|| ApiError::BadRequest {
            message: format!("unknown role: {}", raw),
        })?),
    };

    let ctx = request_context(&req);
    let user = state.auth_service.register(&body.email, &body.password, role, &ctx).await?;

    Ok(HttpResponse::Created().json(RegisterResponseDto { user }))
}

// =============================================================================
// LOGIN
// =============================================================================

/// Authenticates a user with email and password.
///
/// # Route
///
/// `POST /auth/login`
///
/// # Responses
///
/// - **200 OK**: `{ accessToken, user }` + refresh cookie
/// - **401 Unauthorized**: invalid credentials / unverified email
/// - **404 Not Found**: unknown user
/// - **423 Locked**: account locked, `lockedUntil` in details
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let response = state.auth_service.login(&body.email, &body.password, &ctx).await?;

    let cookie = refresh_cookie(
        &state.cookie_name,
        &response.tokens.refresh_token,
        (response.tokens.refresh_expires_at - Utc::now()).num_seconds(),
        state.production,
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponseDto {
        access_token: response.tokens.access_token,
        token_type: "Bearer".to_string(),
        expires_in: response.tokens.expires_in,
        user: response.user,
    }))
}

// =============================================================================
// TOKEN REFRESH
// =============================================================================

/// Exchanges the refresh cookie for a new token pair (rotation).
///
/// # Route
///
/// `POST /auth/refresh`
///
/// # Responses
///
/// - **200 OK**: `{ accessToken }` + rotated refresh cookie
/// - **401 Unauthorized**: missing, unknown, expired, or invalidated token
pub async fn refresh(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = refresh_token_from_cookie(&req, &state.cookie_name)
        .ok_or(ApiError::MissingAuth)?;

    let ctx = request_context(&req);
    let response = state.auth_service.refresh(&token, &ctx).await?;

    let cookie = refresh_cookie(
        &state.cookie_name,
        &response.tokens.refresh_token,
        (response.tokens.refresh_expires_at - Utc::now()).num_seconds(),
        state.production,
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(AccessTokenResponseDto {
        access_token: response.tokens.access_token,
        token_type: "Bearer".to_string(),
        expires_in: response.tokens.expires_in,
    }))
}

// =============================================================================
// LOGOUT
// =============================================================================

/// Ends the current session and clears the refresh cookie.
///
/// # Route
///
/// `POST /auth/logout`
///
/// Idempotent: succeeds with or without a cookie, known token or not.
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = refresh_token_from_cookie(&req, &state.cookie_name);
    let ctx = request_context(&req);

    state.auth_service.logout(token.as_deref(), &ctx).await?;

    Ok(HttpResponse::Ok()
        .cookie(clear_refresh_cookie(&state.cookie_name, state.production))
        .json(MessageResponse::new("Logged out successfully")))
}

// =============================================================================
// PROFILE
// =============================================================================

/// Returns the authenticated user's profile.
///
/// # Route
///
/// `GET /auth/profile` with `Authorization: Bearer <access token>`
pub async fn get_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let profile = state.auth_service.get_profile(user.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": profile })))
}

// =============================================================================
// MAGIC LINK
// =============================================================================

/// Requests a magic login link (silently creating new accounts).
///
/// # Route
///
/// `POST /auth/magic-link/request`
///
/// The 200 response is identical for new and existing addresses.
pub async fn magic_link_request(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<MagicLinkRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let message = state.magic_link_service.request(&body.email, &ctx).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}

/// Redeems a magic link: logs in and verifies the email in one shot.
///
/// # Route
///
/// `POST /auth/magic-link/verify`
///
/// # Responses
///
/// - **200 OK**: `{ accessToken, user }` + refresh cookie
/// - **400 Bad Request**: invalid / expired / already-used link
/// - **423 Locked**: account locked
pub async fn magic_link_verify(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<MagicLinkVerifyRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let response = state.magic_link_service.redeem(&body.token, &ctx).await?;

    let cookie = refresh_cookie(
        &state.cookie_name,
        &response.tokens.refresh_token,
        (response.tokens.refresh_expires_at - Utc::now()).num_seconds(),
        state.production,
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponseDto {
        access_token: response.tokens.access_token,
        token_type: "Bearer".to_string(),
        expires_in: response.tokens.expires_in,
        user: response.user,
    }))
}
