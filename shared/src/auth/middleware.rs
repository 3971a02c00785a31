//! # Request Authentication Primitives
//!
//! Bearer extraction, the role model, and the authenticated-caller type
//! shared by both services.
//!
//! ## Verification Contract
//!
//! Access token verification is a two-step check:
//!
//! 1. **Signature + expiry** - [`crate::auth::jwt::TokenCodec::verify_access`]
//! 2. **Token epoch** - load the user and assert
//!    `claims.token_version == user.token_version`
//!
//! Step 2 needs the database, so the full check lives in the auth service's
//! `verify_access_token` rather than in a transport-level middleware; the
//! handlers pass the bearer string down and receive an
//! [`AuthenticatedUser`] back. A version mismatch is a hard invalidation
//! (`TOKEN_INVALIDATED`, "please log in again") regardless of the token's
//! own expiry.
//!
//! ## Role Model
//!
//! ```text
//! Admin ──────────────────────────►  Can do everything
//!   │
//!   └─► User ────────────────────►  Own profile, sessions, GDPR rights
//! ```

use crate::errors::ApiError;
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// User Roles
// =============================================================================

/// System user roles.
///
/// Stored as text (`USER` / `ADMIN`) in the database and embedded verbatim
/// in token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Default role - can access and manage their own account.
    User,
    /// Full system access - user management, audit queries, bulk operations.
    Admin,
}

impl Role {
    /// Parses a role from its stored string form (case-insensitive).
    ///
    /// Returns `None` for unrecognized values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation stored in the database and claims.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Checks if this role has at least the required permission level.
    pub fn has_permission(&self, required: Self) -> bool {
        match (self, required) {
            (Self::Admin, _) => true,
            (Self::User, Self::User) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Authenticated User
// =============================================================================

/// The verified caller of a protected endpoint.
///
/// Produced by the auth service's access-token verification (signature +
/// stored-epoch check) and passed to handlers as an explicit value - request
/// state is never mutated to carry identity.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The user's unique identifier (from the `sub` claim).
    pub user_id: Uuid,
    /// The user's role at verification time.
    pub role: Role,
}

impl AuthenticatedUser {
    /// Asserts the caller holds the admin role.
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InsufficientPermissions` otherwise.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.has_permission(Role::Admin) {
            Ok(())
        } else {
            Err(ApiError::InsufficientPermissions)
        }
    }
}

// =============================================================================
// Bearer Extraction
// =============================================================================

/// Extracts the bearer token from a request's `Authorization` header.
///
/// ## Errors
///
/// - `ApiError::MissingAuth` - no Authorization header
/// - `ApiError::InvalidToken` - malformed header or empty token
pub fn bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(ApiError::MissingAuth)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidToken)?
        .trim();

    if token.is_empty() {
        return Err(ApiError::InvalidToken);
    }

    Ok(token.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::User.as_str(), "USER");
        assert_eq!(Role::Admin.as_str(), "ADMIN");
    }

    #[test]
    fn test_admin_has_all_permissions() {
        assert!(Role::Admin.has_permission(Role::Admin));
        assert!(Role::Admin.has_permission(Role::User));
    }

    #[test]
    fn test_user_permissions() {
        assert!(Role::User.has_permission(Role::User));
        assert!(!Role::User.has_permission(Role::Admin));
    }

    #[test]
    fn test_require_admin() {
        let admin = AuthenticatedUser { user_id: Uuid::new_v4(), role: Role::Admin };
        assert!(admin.require_admin().is_ok());

        let user = AuthenticatedUser { user_id: Uuid::new_v4(), role: Role::User };
        assert!(matches!(user.require_admin(), Err(ApiError::InsufficientPermissions)));
    }

    #[test]
    fn test_bearer_token_valid() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer my_token_123"))
            .to_http_request();

        assert_eq!(bearer_token(&req).unwrap(), "my_token_123");
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(bearer_token(&req), Err(ApiError::MissingAuth)));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();

        assert!(matches!(bearer_token(&req), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_bearer_token_empty() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();

        assert!(matches!(bearer_token(&req), Err(ApiError::InvalidToken)));
    }
}
