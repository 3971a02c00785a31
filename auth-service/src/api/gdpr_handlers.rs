//! # Request Handlers - GDPR and Self-Service Audit
//!
//! Right-of-access export, self-service anonymization, email change, and
//! the caller's own audit view.

use actix_web::{web, HttpRequest, HttpResponse};
use shared::{errors::ApiError, validation};

use crate::AppState;

use super::context::{clear_refresh_cookie, request_context};
use super::dto::{AnonymizeRequest, AuditLogsResponse, MessageResponse, UpdateEmailRequest};

/// Exports everything the platform holds about the caller.
///
/// # Route
///
/// `GET /auth/gdpr/export`
///
/// Returned as a JSON attachment so browsers download it.
pub async fn export_data(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let ctx = request_context(&req);
    let export = state.gdpr.export_data(user.user_id, &ctx).await?;

    Ok(HttpResponse::Ok()
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"gatehouse-export-{}.json\"", user.user_id),
        ))
        .json(export))
}

/// Irreversibly anonymizes the caller's account.
///
/// # Route
///
/// `POST /auth/gdpr/anonymize`
///
/// Requires `{ "confirmation": "ANONYMIZE_MY_DATA", "password": "..." }`.
/// Clears the refresh cookie - every credential is gone after this.
pub async fn anonymize(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<AnonymizeRequest>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    state
        .gdpr
        .anonymize(user.user_id, &body.confirmation, &body.password, &ctx)
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(clear_refresh_cookie(&state.cookie_name, state.production))
        .json(MessageResponse::new(
            "Your data has been anonymized and all sessions terminated",
        )))
}

/// Changes the caller's email address; verification starts over.
///
/// # Route
///
/// `PATCH /auth/gdpr/update-email`
pub async fn update_email(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<UpdateEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let updated = state.gdpr.update_email(user.user_id, &body.new_email, &ctx).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": updated,
        "message": "Verification email sent to the new address",
    })))
}

/// Returns the caller's own recent audit rows.
///
/// # Route
///
/// `GET /auth/audit/me`
pub async fn my_audit_logs(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = shared::auth::bearer_token(&req)?;
    let user = state.auth_service.verify_access_token(&token).await?;

    let logs = state.audit.recent_for_user(user.user_id).await?;

    Ok(HttpResponse::Ok().json(AuditLogsResponse { logs }))
}
