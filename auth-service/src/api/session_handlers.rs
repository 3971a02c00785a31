//! # Request Handlers - Sessions
//!
//! The session surface: list active logins, revoke one, revoke the others,
//! revoke everything. All endpoints require a verified access token; the
//! refresh cookie (when present) identifies "this device".

use actix_web::{web, HttpRequest, HttpResponse};
use shared::errors::ApiError;
use uuid::Uuid;

use crate::AppState;

use super::context::{refresh_token_from_cookie, request_context};
use super::dto::{MessageResponse, RevokedCountResponse, SessionsResponse};

/// Lists the caller's active sessions.
///
/// # Route
///
/// `GET /auth/sessions`
///
/// The raw refresh token is never included; the session carrying the
/// caller's cookie is flagged `current`.
pub async fn list_sessions(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let current = refresh_token_from_cookie(&req, &state.cookie_name);
    let sessions = state.sessions.list_active(user.user_id, current.as_deref()).await?;

    Ok(HttpResponse::Ok().json(SessionsResponse { sessions }))
}

/// Revokes one of the caller's sessions.
///
/// # Route
///
/// `DELETE /auth/sessions/{id}`
///
/// Unknown ids and other users' sessions get the same 404.
pub async fn revoke_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let session_id = path.into_inner();
    let ctx = request_context(&req);

    state.sessions.revoke(session_id, user.user_id, &ctx).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Session revoked")))
}

/// Revokes every session except the one carrying the current refresh cookie.
///
/// # Route
///
/// `POST /auth/sessions/logout-other-devices`
pub async fn logout_other_devices(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    // Without the cookie there is no "current device" to spare.
    let current = refresh_token_from_cookie(&req, &state.cookie_name)
        .ok_or(ApiError::MissingAuth)?;

    let ctx = request_context(&req);
    let revoked_count = state.sessions.revoke_all_other(user.user_id, &current, &ctx).await?;

    Ok(HttpResponse::Ok().json(RevokedCountResponse { revoked_count }))
}

/// Revokes every session, including the current one.
///
/// # Route
///
/// `POST /auth/sessions/logout-all-devices`
pub async fn logout_all_devices(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let ctx = request_context(&req);
    let revoked_count = state.sessions.revoke_all(user.user_id, &ctx).await?;

    Ok(HttpResponse::Ok()
        .cookie(super::context::clear_refresh_cookie(&state.cookie_name, state.production))
        .json(RevokedCountResponse { revoked_count }))
}
