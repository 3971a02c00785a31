//! # Password Hashing with bcrypt
//!
//! Secure password storage using the bcrypt algorithm.
//!
//! ## Cost Factor
//!
//! Hashes are produced with cost 12 (the policy floor is 10). Each unit
//! doubles the work factor; 12 keeps verification around 250 ms on current
//! hardware, slow enough to blunt offline brute force while staying inside
//! the request budget.
//!
//! ## Hash Format
//!
//! bcrypt emits a self-describing modular crypt string:
//!
//! ```text
//! $2b$12$<22-char salt><31-char hash>
//!   │  │   └── Salt and digest, base64 (bcrypt alphabet)
//!   │  └────── Cost factor (2^12 rounds)
//!   └───────── Algorithm revision
//! ```
//!
//! The salt is generated per hash, so the same password never produces the
//! same string twice, and verification is constant-time.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::auth::password::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//!
//! // During registration
//! let hash = hasher.hash(&password)?;
//!
//! // During login
//! if hasher.verify(&password, &stored_hash)? {
//!     // Password correct
//! }
//! ```

use crate::errors::ApiError;

/// bcrypt cost factor used for all new hashes. Policy minimum is 10.
const BCRYPT_COST: u32 = 12;

// =============================================================================
// Password Hasher
// =============================================================================

/// Secure password hashing service.
///
/// ## Thread Safety
///
/// This type is `Clone` and `Send + Sync`, safe for concurrent use.
/// Each hash operation generates a new random salt.
#[derive(Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a new hasher with the standard cost factor.
    pub fn new() -> Self {
        Self
    }

    /// Hashes a password for secure storage.
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InternalError` if hashing fails (rare).
    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        bcrypt::hash(password, BCRYPT_COST).map_err(|e| ApiError::InternalError {
            message: format!("Password hashing failed: {}", e),
        })
    }

    /// Verifies a password against a stored hash.
    ///
    /// Comparison is constant-time; an attacker cannot learn how "close" a
    /// guess was.
    ///
    /// ## Returns
    ///
    /// - `Ok(true)` - password matches
    /// - `Ok(false)` - password doesn't match
    /// - `Err(...)` - stored hash is malformed
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        bcrypt::verify(password, hash).map_err(|e| ApiError::InternalError {
            message: format!("Password verification failed: {}", e),
        })
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

// =============================================================================
// Password Validator
// =============================================================================

/// Validates password strength before hashing.
///
/// ## Requirements
///
/// | Requirement | Reason |
/// |-------------|--------|
/// | 8+ characters | Increases search space |
/// | 1+ letter | Rejects all-digit PINs |
/// | 1+ digit | Increases character set |
pub struct PasswordValidator;

impl PasswordValidator {
    /// Validates that a password meets minimum strength requirements.
    ///
    /// ## Returns
    ///
    /// - `Ok(())` - password meets all requirements
    /// - `Err(Vec<&str>)` - list of failed requirements
    pub fn validate(password: &str) -> Result<(), Vec<&'static str>> {
        let mut errors = Vec::new();

        if password.len() < 8 {
            errors.push("Password must be at least 8 characters long");
        }

        if !password.chars().any(|c| c.is_alphabetic()) {
            errors.push("Password must contain at least one letter");
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one digit");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_correct_password() {
        let hasher = PasswordHasher::new();
        let password = "Str0ngPass!";

        let hash = hasher.hash(password).unwrap();

        assert_ne!(hash, password);
        assert!(hasher.verify(password, &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Str0ngPass!").unwrap();

        assert!(!hasher.verify("WrongPass1!", &hash).unwrap());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hasher = PasswordHasher::new();
        let password = "Str0ngPass!";

        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // Each hash should be unique due to random salt
        assert_ne!(hash1, hash2);
        assert!(hasher.verify(password, &hash1).unwrap());
        assert!(hasher.verify(password, &hash2).unwrap());
    }

    #[test]
    fn test_hash_carries_cost_factor() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Str0ngPass!").unwrap();

        // Modular crypt format with the configured cost
        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$12$"));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let hasher = PasswordHasher::new();
        assert!(hasher.verify("whatever", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_password_validator_valid() {
        assert!(PasswordValidator::validate("Str0ngPass!").is_ok());
        assert!(PasswordValidator::validate("abcdefg1").is_ok());
    }

    #[test]
    fn test_password_validator_too_short() {
        let errors = PasswordValidator::validate("ab1").unwrap_err();
        assert!(errors.contains(&"Password must be at least 8 characters long"));
    }

    #[test]
    fn test_password_validator_missing_digit() {
        let errors = PasswordValidator::validate("abcdefgh").unwrap_err();
        assert!(errors.contains(&"Password must contain at least one digit"));
    }

    #[test]
    fn test_password_validator_missing_letter() {
        let errors = PasswordValidator::validate("12345678").unwrap_err();
        assert!(errors.contains(&"Password must contain at least one letter"));
    }
}
