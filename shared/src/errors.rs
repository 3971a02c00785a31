//! # Application Error Types
//!
//! Unified error handling for both services with automatic HTTP conversion.
//!
//! ## Design Philosophy
//!
//! Each error variant maps to a specific HTTP status code and a stable
//! machine-readable error code, ensuring consistent API responses across
//! the auth and email services.
//!
//! ## Error Categories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ApiError Categories                            │
//! ├─────────────────────────┬───────────────────┬───────────────────────────┤
//! │ Authentication (401)    │ Authorization(403)│ Validation (400)          │
//! ├─────────────────────────┼───────────────────┼───────────────────────────┤
//! │ InvalidCredentials      │ InsufficientPerms │ ValidationError           │
//! │ TokenExpired            │ AccessDenied      │ BadRequest                │
//! │ InvalidToken            │                   │ InvalidUuid               │
//! │ MissingAuth             │                   │                           │
//! │ TokenInvalidated        │                   │                           │
//! │ EmailNotVerified        │                   │                           │
//! ├─────────────────────────┼───────────────────┼───────────────────────────┤
//! │ Resources (404, 409)    │ Lockout (423)     │ Server (500, 502)         │
//! ├─────────────────────────┼───────────────────┼───────────────────────────┤
//! │ NotFound                │ AccountLocked     │ DatabaseError             │
//! │ Conflict                │                   │ MailDispatch              │
//! │                         │ Rate limit (429)  │ Dependency                │
//! │                         │ TooManyRequests   │ InternalError             │
//! └─────────────────────────┴───────────────────┴───────────────────────────┘
//! ```
//!
//! ## HTTP Response Format
//!
//! All errors are serialized to a consistent JSON format:
//!
//! ```json
//! {
//!   "code": "ACCOUNT_LOCKED",
//!   "message": "Account locked",
//!   "details": { "locked_until": "2024-01-15T10:30:00Z" },
//!   "timestamp": "2024-01-15T10:00:00Z"
//! }
//! ```
//!
//! Internal errors never leak their message to the client; the detail is
//! logged and a generic body is returned.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Main Error Enum
// =============================================================================

/// Application error type with automatic HTTP status mapping.
///
/// Each variant represents a specific error condition and maps to an
/// appropriate HTTP status code. The `#[error]` attribute defines the
/// client-facing message format.
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Authentication Errors (401 Unauthorized)
    // =========================================================================
    // The caller is not authenticated or their credentials are invalid.

    /// Wrong email/password combination. Also returned for unknown emails so
    /// the response cannot be used to enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// JWT has expired. Client should refresh (access) or re-login (refresh).
    #[error("Token expired")]
    TokenExpired,

    /// JWT is malformed, has an invalid signature, or is of the wrong kind.
    #[error("Invalid token")]
    InvalidToken,

    /// Request doesn't include the required credential (bearer or cookie).
    #[error("Missing authentication")]
    MissingAuth,

    /// The token's embedded version no longer matches the user's current
    /// token version - every token issued before the epoch bump is dead.
    #[error("Token invalidated, please log in again")]
    TokenInvalidated,

    /// Login attempted before the email address was verified.
    #[error("Email not verified")]
    EmailNotVerified,

    // =========================================================================
    // Lockout (423 Locked)
    // =========================================================================

    /// Account temporarily locked after too many failed login attempts.
    /// Returns 423 Locked with `locked_until` in details.
    #[error("Account locked")]
    AccountLocked {
        /// When the account will be automatically unlocked
        until: chrono::DateTime<chrono::Utc>,
    },

    // =========================================================================
    // Authorization Errors (403 Forbidden)
    // =========================================================================
    // Authenticated but lacking permission. Re-authenticating won't help.

    /// The caller's role doesn't allow this action (e.g. non-admin on an
    /// admin route).
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// Ownership check failed for a specific resource.
    #[error("Resource access denied")]
    AccessDenied,

    // =========================================================================
    // Validation Errors (400 Bad Request)
    // =========================================================================

    /// Request body failed validation rules.
    /// Contains field-level errors from the `validator` crate.
    #[error("Validation error")]
    ValidationError(#[from] ValidationErrors),

    /// Generic bad request with a business-level message
    /// ("invalid reset token", "cannot delete your own account", ...).
    #[error("{message}")]
    BadRequest {
        /// Human-readable description of what's wrong
        message: String,
    },

    /// UUID parsing failed.
    #[error("Invalid UUID format")]
    InvalidUuid,

    // =========================================================================
    // Resource Errors (404 Not Found, 409 Conflict)
    // =========================================================================

    /// Requested resource doesn't exist.
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Resource identifier (e.g., "user:123", "session:abc")
        resource: String,
    },

    /// Action would violate a uniqueness constraint.
    /// Example: registering with an email that's already in use.
    #[error("Resource already exists: {resource}")]
    Conflict {
        /// Description of the conflict (e.g., "email already registered")
        resource: String,
    },

    // =========================================================================
    // Rate Limiting (429 Too Many Requests)
    // =========================================================================

    /// Client has exceeded request rate limits (set by edge middleware).
    #[error("Too many requests")]
    TooManyRequests {
        /// Seconds until the client can retry
        retry_after_seconds: u64,
    },

    // =========================================================================
    // Server Errors (500, 502)
    // =========================================================================
    // Logged as errors and monitored. Details are NOT exposed to clients.

    /// PostgreSQL query failed. Wraps `sqlx::Error`.
    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    /// Outbound mail could not be dispatched. Returns 502.
    #[error("Mail dispatch failed")]
    MailDispatch {
        /// Internal message for logging (not exposed to client)
        message: String,
    },

    /// A peer service call failed. Returns 502.
    #[error("Dependency unavailable")]
    Dependency {
        /// Name of the unavailable dependency
        service: String,
    },

    /// Unspecified internal error. Use as last resort.
    #[error("Internal server error")]
    InternalError {
        /// Internal message for logging (not exposed to client)
        message: String,
    },
}

// =============================================================================
// Error Methods
// =============================================================================

impl ApiError {
    /// Returns a machine-readable error code.
    ///
    /// These codes are stable and can be used by API clients for
    /// programmatic error handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            // Authentication
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::MissingAuth => "MISSING_AUTH",
            Self::TokenInvalidated => "TOKEN_INVALIDATED",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            // Lockout
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            // Authorization
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::AccessDenied => "ACCESS_DENIED",
            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::InvalidUuid => "INVALID_UUID",
            // Resources
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            // Rate limiting
            Self::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            // Server
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::MailDispatch { .. } => "MAIL_DISPATCH_FAILED",
            Self::Dependency { .. } => "DEPENDENCY_UNAVAILABLE",
            Self::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// This is the source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 401 Unauthorized - Authentication required or failed
            Self::InvalidCredentials
            | Self::TokenExpired
            | Self::InvalidToken
            | Self::MissingAuth
            | Self::TokenInvalidated
            | Self::EmailNotVerified => StatusCode::UNAUTHORIZED,

            // 423 Locked - account lockout surfaces its release time
            Self::AccountLocked { .. } => StatusCode::LOCKED,

            // 403 Forbidden - Authenticated but not authorized
            Self::InsufficientPermissions | Self::AccessDenied => StatusCode::FORBIDDEN,

            // 400 Bad Request - Client sent invalid data
            Self::ValidationError(_) | Self::BadRequest { .. } | Self::InvalidUuid => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::Conflict { .. } => StatusCode::CONFLICT,

            // 429 Too Many Requests
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 502 Bad Gateway - a dependency failed
            Self::MailDispatch { .. } | Self::Dependency { .. } => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::DatabaseError(_) | Self::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` if this is a server-side error (5xx).
    ///
    /// Server errors are logged at ERROR level and reported to telemetry;
    /// client errors (4xx) are logged at WARN level and filtered out.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_)
                | Self::MailDispatch { .. }
                | Self::Dependency { .. }
                | Self::InternalError { .. }
        )
    }
}

// =============================================================================
// Response Structure
// =============================================================================

/// Standard error response body for the API.
///
/// ## Fields
///
/// - `code`: Machine-readable error code (e.g., "ACCOUNT_LOCKED")
/// - `message`: Human-readable message
/// - `request_id`: UUID for tracing requests across services
/// - `details`: Additional context (validation errors, `locked_until`, etc.)
/// - `timestamp`: When the error occurred (ISO 8601 format)
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code for programmatic handling
    pub code: String,

    /// Human-readable message (for debugging, not for user display)
    pub message: String,

    /// Request ID for tracing across services
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Additional error details (varies by error type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// When the error occurred (ISO 8601 format)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    /// Creates a new error response from an `ApiError`.
    ///
    /// Automatically extracts relevant details based on error type:
    /// - ValidationError: field-level validation errors
    /// - TooManyRequests: retry delay
    /// - AccountLocked: unlock timestamp
    pub fn new(error: &ApiError) -> Self {
        let details = match error {
            ApiError::ValidationError(errors) => {
                Some(serde_json::to_value(errors).unwrap_or_default())
            }
            ApiError::TooManyRequests { retry_after_seconds } => {
                Some(serde_json::json!({ "retry_after_seconds": retry_after_seconds }))
            }
            ApiError::AccountLocked { until } => {
                Some(serde_json::json!({ "locked_until": until }))
            }
            // Server errors: don't expose internal details
            _ => None,
        };

        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            request_id: None,
            details,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Adds a request ID for tracing.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

// =============================================================================
// Actix-web Integration
// =============================================================================

/// Implements Actix-web's `ResponseError` trait, so handlers can return
/// `ApiError` directly and get the mapped status plus JSON body.
impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        // Delegate to our implementation
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }
        let response = ErrorResponse::new(self);
        HttpResponse::build(self.status_code()).json(response)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_errors_return_401() {
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenInvalidated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::EmailNotVerified.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_account_locked_returns_423() {
        let err = ApiError::AccountLocked { until: chrono::Utc::now() };
        assert_eq!(err.status_code(), StatusCode::LOCKED);
        assert_eq!(err.error_code(), "ACCOUNT_LOCKED");
    }

    #[test]
    fn test_account_locked_details_carry_release_time() {
        let until = chrono::Utc::now();
        let response = ErrorResponse::new(&ApiError::AccountLocked { until });
        let details = response.details.expect("locked error should carry details");
        assert!(details.get("locked_until").is_some());
    }

    #[test]
    fn test_authorization_errors_return_403() {
        assert_eq!(ApiError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::AccessDenied.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_dependency_errors_return_502() {
        let mail = ApiError::MailDispatch { message: "connection refused".to_string() };
        assert_eq!(mail.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(mail.error_code(), "MAIL_DISPATCH_FAILED");

        let dep = ApiError::Dependency { service: "email-service".to_string() };
        assert_eq!(dep.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_resource_errors() {
        assert_eq!(
            ApiError::NotFound { resource: "user".to_string() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict { resource: "email".to_string() }.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_bad_request_uses_business_message() {
        let err = ApiError::BadRequest { message: "cannot delete your own account".to_string() };
        assert_eq!(err.to_string(), "cannot delete your own account");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_errors_are_flagged() {
        assert!(ApiError::InternalError { message: "test".to_string() }.is_server_error());
        assert!(ApiError::MailDispatch { message: "test".to_string() }.is_server_error());
        assert!(!ApiError::InvalidCredentials.is_server_error());
        assert!(!ApiError::AccountLocked { until: chrono::Utc::now() }.is_server_error());
    }

    #[test]
    fn test_error_response_with_request_id() {
        let error = ApiError::InvalidCredentials;
        let request_id = Uuid::new_v4();
        let response = ErrorResponse::new(&error).with_request_id(request_id);

        assert_eq!(response.request_id, Some(request_id.to_string()));
    }
}
