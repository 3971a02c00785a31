//! # Request Validation Helpers
//!
//! Utilities for validating incoming request data using the `validator`
//! crate.
//!
//! DTOs derive `Validate` and declare rules inline; handlers call
//! [`validate_request`] before touching the service layer. Validation
//! failures become `ApiError::ValidationError` with field-level details
//! serialized into the 400 response body.
//!
//! ```rust,ignore
//! use validator::Validate;
//!
//! #[derive(Validate)]
//! struct RegisterRequest {
//!     #[validate(email)]
//!     email: String,
//!
//!     #[validate(length(min = 8, max = 128))]
//!     password: String,
//! }
//!
//! async fn handler(body: Json<RegisterRequest>) -> Result<impl Responder, ApiError> {
//!     validate_request(&body)?;
//!     // Continue with validated data
//! }
//! ```

use crate::errors::ApiError;
use serde::de::DeserializeOwned;
use validator::Validate;

// =============================================================================
// Core Validation Functions
// =============================================================================

/// Validates a request DTO that implements `Validate`.
///
/// ## Errors
///
/// Returns `ApiError::ValidationError` with field-level details if
/// validation fails.
pub fn validate_request<T: Validate>(data: &T) -> Result<(), ApiError> {
    data.validate().map_err(ApiError::ValidationError)
}

/// Parses JSON and validates in a single step.
///
/// ## Errors
///
/// - `ApiError::BadRequest` if JSON parsing fails
/// - `ApiError::ValidationError` if validation fails
pub fn parse_and_validate<T: DeserializeOwned + Validate>(json: &str) -> Result<T, ApiError> {
    let data: T = serde_json::from_str(json)
        .map_err(|e| ApiError::BadRequest { message: e.to_string() })?;

    validate_request(&data)?;

    Ok(data)
}

// =============================================================================
// Custom Validators
// =============================================================================

/// Custom validation functions for use with `#[validate(custom)]`.
pub mod validators {
    use validator::ValidationError;

    /// Validates that a string is not blank (empty or whitespace-only).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }
}

/// Normalizes an email address for storage and lookup.
///
/// Addresses are case-folded to lowercase and trimmed at every entry point
/// (register, login, magic-link request, reset request, update-email) so the
/// unique index on `users.email` sees one canonical form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::validators::*;
    use super::*;

    #[test]
    fn test_not_blank_valid() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("  hello  ").is_ok());
    }

    #[test]
    fn test_not_blank_invalid() {
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("\t\n").is_err());
    }

    #[test]
    fn test_normalize_email_case_folds() {
        assert_eq!(normalize_email("Alice@Example.COM"), "alice@example.com");
        assert_eq!(normalize_email("  bob@example.com "), "bob@example.com");
    }
}
