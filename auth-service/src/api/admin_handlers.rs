//! # Request Handlers - Admin and Internal
//!
//! User administration (role change, deletion, bulk deletion), the audit
//! query, and the internal audit-relay endpoint the email service posts to.
//!
//! Admin routes verify the access token and then assert the ADMIN role; the
//! internal route authenticates with the optional shared secret instead
//! (the services are expected to share a private network).

use actix_web::{web, HttpRequest, HttpResponse};
use shared::{auth::AuthenticatedUser, auth::Role, errors::ApiError, validation};
use uuid::Uuid;

use crate::domain::{AuditAction, AuditLogFilter, NewAuditLog};
use crate::AppState;

use super::context::request_context;
use super::dto::{
    AuditQueryParams, ChangeRoleRequest, DeleteAllUsersRequest, DeletedCountResponse,
    InternalAuditLogRequest, MessageResponse, UsersResponse,
};

/// Verifies the bearer and asserts the ADMIN role.
async fn require_admin(
    req: &HttpRequest,
    state: &AppState,
) -> Result<AuthenticatedUser, ApiError> {
    let token = shared::auth::bearer_token(req)?;
    let user = state.auth_service.verify_access_token(&token).await?;
    user.require_admin()?;
    Ok(user)
}

// =============================================================================
// USER ADMINISTRATION
// =============================================================================

/// Lists all users.
///
/// # Route
///
/// `GET /auth/admin/users`
pub async fn list_users(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &state).await?;

    let users = state.auth_service.list_users().await?;

    Ok(HttpResponse::Ok().json(UsersResponse { users }))
}

/// Changes a user's role.
///
/// # Route
///
/// `PATCH /auth/admin/users/{id}/role`
///
/// Self-change is rejected with 400.
pub async fn change_role(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ChangeRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let role = Role::parse(&body.role)
        .ok_or_else(|| ApiError::BadRequest { message: format!("unknown role: {}", body.role) })?;

    let ctx = request_context(&req);
    let user = state
        .auth_service
        .change_role(path.into_inner(), role, &admin, &ctx)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}

/// Deletes a user and all dependents.
///
/// # Route
///
/// `DELETE /auth/admin/users/{id}`
///
/// Self-deletion is rejected with 400.
pub async fn delete_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, &state).await?;

    let ctx = request_context(&req);
    state.auth_service.delete_user(path.into_inner(), &admin, &ctx).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("User deleted")))
}

/// Permanently deletes a user, pinning their identifiers into the audit row.
///
/// # Route
///
/// `DELETE /auth/admin/users/{id}/permanent`
pub async fn permanent_delete_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, &state).await?;

    let ctx = request_context(&req);
    state.gdpr.permanent_delete(path.into_inner(), &admin, &ctx).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("User permanently deleted")))
}

/// Deletes every non-admin user.
///
/// # Route
///
/// `DELETE /auth/admin/users`
pub async fn delete_all_non_admins(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, &state).await?;

    let ctx = request_context(&req);
    let deleted_count = state.auth_service.delete_all_non_admins(&admin, &ctx).await?;

    Ok(HttpResponse::Ok().json(DeletedCountResponse { deleted_count }))
}

/// Deletes every user except the caller.
///
/// # Route
///
/// `POST /auth/admin/users/delete-all`
///
/// Requires the body confirmation literal `DELETE_ALL_USERS`.
pub async fn delete_all_users(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<DeleteAllUsersRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ctx = request_context(&req);
    let deleted_count =
        state.auth_service.delete_all_users(&body.confirmation, &admin, &ctx).await?;

    Ok(HttpResponse::Ok().json(DeletedCountResponse { deleted_count }))
}

// =============================================================================
// AUDIT QUERY
// =============================================================================

/// Filtered, paginated audit query.
///
/// # Route
///
/// `GET /auth/admin/audit?userId=&action=&success=&from=&to=&page=&limit=`
pub async fn query_audit(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<AuditQueryParams>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &state).await?;

    let query = query.into_inner();

    let action = match query.action.as_deref() {
        None => None,
        Some(raw) => Some(AuditAction::parse(raw).ok_or_else(|| ApiError::BadRequest {
            message: format!("unknown audit action: {}", raw),
        })?),
    };

    let filter = AuditLogFilter {
        user_id: query.user_id,
        action,
        success: query.success,
        from: query.from,
        to: query.to,
    };

    let page = state
        .audit
        .query(filter, query.page.unwrap_or(1), query.limit.unwrap_or(0))
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

// =============================================================================
// INTERNAL AUDIT RELAY
// =============================================================================

/// Appends an audit row on behalf of the email service.
///
/// # Route
///
/// `POST /auth/internal/audit-log`
///
/// When `INTERNAL_SHARED_SECRET` is configured, the caller must present it
/// in `X-Internal-Secret`; otherwise the route trusts network isolation.
pub async fn internal_audit_log(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<InternalAuditLogRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(expected) = &state.internal_secret {
        let presented = req
            .headers()
            .get("X-Internal-Secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if presented != expected {
            return Err(ApiError::AccessDenied);
        }
    }

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let action = AuditAction::parse(&body.action).ok_or_else(|| ApiError::BadRequest {
        message: format!("unknown audit action: {}", body.action),
    })?;

    state
        .audit
        .record(NewAuditLog {
            user_id: body.user_id,
            performed_by: body.performed_by,
            action,
            resource: body.resource,
            ip_address: body.ip_address,
            user_agent: body.user_agent,
            metadata: body.metadata.unwrap_or_else(|| serde_json::json!({})),
            success: body.success.unwrap_or(true),
            error_message: body.error_message,
        })
        .await;

    Ok(HttpResponse::Created().json(MessageResponse::new("Audit log recorded")))
}
