//! # Data Transfer Objects (DTOs)
//!
//! The API contract of the email service. All endpoints are invoked either
//! by the auth service (private network) or by the browser client following
//! an emailed link.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// REQUESTS
// =============================================================================

/// Body of `POST /email/send-verification` (auth service → here).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
    /// The user to mint the token for
    pub user_id: Uuid,

    /// The address to dispatch to
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Body of `POST /email/verify-email`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    /// The token from the emailed link
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// Body of `POST /email/resend-verification`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResendVerificationRequest {
    /// The unverified account's address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Body of `POST /email/forgot-password`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    /// The address to send the reset link to
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Body of `POST /email/reset-password`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// The one-shot reset token
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    /// The new password
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Body of `POST /email/send-magic-link` (auth service → here).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMagicLinkRequest {
    /// The address to dispatch to
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// The already-minted magic-link token
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    /// Whether the account was just created - the template greets
    /// accordingly
    #[serde(default)]
    pub is_new_user: bool,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Generic message response.
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
    fn test_reset_password_enforces_policy() {
        let request = ResetPasswordRequest {
            token: "tok".to_string(),
            new_password: "short".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("new_password"));
    }

    #[test]
    fn test_send_magic_link_new_user_defaults_false() {
        let request: SendMagicLinkRequest = serde_json::from_str(
            r#"{ "email": "a@example.com", "token": "tok" }"#,
        )
        .unwrap();

        assert!(!request.is_new_user);
    }

    #[test]
    fn test_camel_case_fields() {
        let request: SendVerificationRequest = serde_json::from_str(&format!(
            r#"{{ "userId": "{}", "email": "a@example.com" }}"#,
            Uuid::new_v4()
        ))
        .unwrap();

        assert_eq!(request.email, "a@example.com");
    }
}
