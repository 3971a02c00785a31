//! # Data Transfer Objects (DTOs)
//!
//! The API contract of the auth service: request validation via the
//! `validator` derive, camelCase JSON on both directions.
//!
//! ## Token Placement
//!
//! Access tokens travel in JSON bodies; refresh tokens only ever travel in
//! the HTTP-only cookie. No response DTO carries a refresh token.
//!
//! ## Validation Rules
//!
//! | Field | Rules |
//! |--------------|-----------------------------------------------------|
//! | `email` | Valid email format, max 255 chars |
//! | `password` | Min 8 chars, max 128 chars (login: non-empty) |
//! | `token` | Non-blank |
//! | `confirmation` | Non-blank (checked against the literal in the service) |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::UserSummary;
use crate::service::session_service::SessionView;

// =============================================================================
// AUTH REQUESTS
// =============================================================================

/// Request body for user registration.
///
/// ```json
/// { "email": "user@example.com", "password": "Str0ngPass!", "role": "USER" }
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// User's email address
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub email: String,

    /// Plain text password
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    /// Optional role ("USER" or "ADMIN"); defaults to USER
    pub role: Option<String>,
}

/// Request body for user login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// User's email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plain text password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for requesting a magic link.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkRequest {
    /// Address to send the link to (account is created silently if new)
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub email: String,
}

/// Request body for redeeming a magic link.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkVerifyRequest {
    /// The token from the emailed link
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

// =============================================================================
// ADMIN REQUESTS
// =============================================================================

/// Request body for changing a user's role.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    /// The new role: "USER" or "ADMIN"
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Request body for the delete-all-users operation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllUsersRequest {
    /// Must be exactly `DELETE_ALL_USERS`
    #[validate(length(min = 1, message = "Confirmation is required"))]
    pub confirmation: String,
}

/// Query parameters for the admin audit view.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuditQueryParams {
    /// Restrict to one user
    pub user_id: Option<Uuid>,
    /// Restrict to one action (storage form, e.g. `USER_LOGIN`)
    pub action: Option<String>,
    /// Restrict by outcome
    pub success: Option<bool>,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub to: Option<DateTime<Utc>>,
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size (clamped server-side)
    pub limit: Option<u32>,
}

/// Body of the internal audit-relay endpoint (posted by the email service).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InternalAuditLogRequest {
    /// Affected user
    pub user_id: Option<Uuid>,
    /// Acting admin, when administrative
    pub performed_by: Option<Uuid>,
    /// Action in storage form
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,
    /// Affected resource
    pub resource: Option<String>,
    /// Client IP observed by the peer
    pub ip_address: Option<String>,
    /// Client user agent observed by the peer
    pub user_agent: Option<String>,
    /// Structured context
    pub metadata: Option<serde_json::Value>,
    /// Outcome; defaults to success
    pub success: Option<bool>,
    /// Failure detail
    pub error_message: Option<String>,
}

// =============================================================================
// GDPR REQUESTS
// =============================================================================

/// Request body for self-service anonymization.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnonymizeRequest {
    /// Must be exactly `ANONYMIZE_MY_DATA`
    #[validate(length(min = 1, message = "Confirmation is required"))]
    pub confirmation: String,

    /// The account password, re-checked before the irreversible scrub
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for changing the account email.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailRequest {
    /// The new address (verification starts over)
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub new_email: String,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Response for registration: the created account, no tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponseDto {
    /// The created user
    pub user: UserSummary,
}

/// Response for login and magic-link redemption.
///
/// The refresh token is set as an HTTP-only cookie, never serialized here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponseDto {
    /// JWT access token for API requests
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// User summary
    pub user: UserSummary,
}

/// Response for the refresh endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponseDto {
    /// New JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// The caller's active sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsResponse {
    /// Active sessions, most recently active first
    pub sessions: Vec<SessionView>,
}

/// Count of revoked sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedCountResponse {
    /// How many sessions were revoked
    pub revoked_count: u64,
}

/// Admin user listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    /// All users, newest first
    pub users: Vec<UserSummary>,
}

/// The caller's own audit rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogsResponse {
    /// Recent rows, newest first
    pub logs: Vec<crate::domain::AuditLogEntry>,
}

/// Count of bulk-deleted users.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCountResponse {
    /// How many users were deleted
    pub deleted_count: u64,
}

/// Generic message response for simple confirmations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
}

impl MessageResponse {
    /// Creates a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service name
    pub service: String,
    /// Current timestamp
    pub timestamp: String,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_valid() {
        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "Str0ngPass!".to_string(),
            role: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_register_request_invalid_email() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "Str0ngPass!".to_string(),
            role: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_short_password() {
        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "short".to_string(),
            role: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_login_accepts_any_nonempty_password() {
        // Login must not leak the password policy - old accounts may
        // predate it.
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "x".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_magic_link_verify_requires_token() {
        let request = MagicLinkVerifyRequest { token: String::new() };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_auth_response_has_no_refresh_field() {
        let dto = AuthResponseDto {
            access_token: "jwt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 900,
            user: UserSummary {
                id: Uuid::new_v4(),
                email: "a@example.com".to_string(),
                role: "USER".to_string(),
                email_verified: true,
                last_login_at: None,
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains("accessToken"));
        assert!(!json.to_lowercase().contains("refresh"));
    }

    #[test]
    fn test_audit_query_params_deserialize_from_query() {
        let params: AuditQueryParams =
            serde_urlencoded_like("action=USER_LOGIN&success=true&page=2&limit=50");
        assert_eq!(params.action.as_deref(), Some("USER_LOGIN"));
        assert_eq!(params.success, Some(true));
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, Some(50));
    }

    /// Decodes query-string-shaped input through serde_json for the test -
    /// actix uses serde_urlencoded with identical field semantics.
    fn serde_urlencoded_like(query: &str) -> AuditQueryParams {
        let mut map = serde_json::Map::new();
        for pair in query.split('&') {
            let (k, v) = pair.split_once('=').unwrap();
            let value = match k {
                "success" => serde_json::Value::Bool(v.parse().unwrap()),
                "page" | "limit" => serde_json::Value::Number(v.parse::<u32>().unwrap().into()),
                _ => serde_json::Value::String(v.to_string()),
            };
            map.insert(k.to_string(), value);
        }
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }
}
