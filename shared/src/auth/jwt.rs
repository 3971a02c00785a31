//! # JWT Token Codecs
//!
//! Signing and verification for every token kind the platform issues.
//!
//! ## Token Inventory
//!
//! | Token | TTL | Secret | Backing row |
//! |-------|-----|--------|-------------|
//! | Access | 15 min | `JWT_ACCESS_SECRET` | none (stateless) |
//! | Refresh | 7 days | `JWT_REFRESH_SECRET` | `refresh_tokens` + `sessions` |
//! | Verification | 24 h | `EMAIL_TOKEN_SECRET` | `verification_tokens` |
//! | Password reset | 1 h | `EMAIL_TOKEN_SECRET` | `password_reset_tokens` |
//! | Magic link | 15 min | `EMAIL_TOKEN_SECRET` | `magic_link_tokens` |
//!
//! ## Claims
//!
//! Access and refresh tokens carry `{sub, role, token_version}`. The
//! `token_version` claim is the per-user epoch: callers MUST compare it with
//! the stored `users.token_version` after signature verification - a mismatch
//! means every token minted before the epoch bump is invalid, regardless of
//! its own expiry. The codec itself never touches the database.
//!
//! Out-of-band tokens carry `{sub, kind}` so a caller holding only the token
//! can look up the row and cross-check the claimed owner against the stored
//! `user_id`.
//!
//! ## Security Notes
//!
//! - HS256 signing; each secret must be at least 32 characters
//! - The three secrets are independent - leaking one never mints another kind
//! - Secrets are read once at startup and held immutable

use crate::config::{EmailTokenConfig, JwtConfig};
use crate::errors::ApiError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Claims Structures
// =============================================================================

/// Claims carried by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's unique identifier (UUID).
    pub sub: Uuid,

    /// User's role for authorization decisions ("USER" or "ADMIN").
    pub role: String,

    /// Per-user token epoch. Compared against the stored value on every
    /// verification; incremented on password reset to invalidate all
    /// outstanding tokens at once.
    pub token_version: i32,

    /// Issuer - identifies who created the token.
    pub iss: String,

    /// Audience - identifies who the token is intended for.
    pub aud: String,

    /// Expiration time as Unix timestamp (seconds since epoch).
    pub exp: i64,

    /// Issued at time as Unix timestamp.
    pub iat: i64,

    /// JWT ID - unique identifier for this specific token.
    pub jti: Uuid,

    /// Token type to distinguish access from refresh tokens.
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Distinguishes between access and refresh tokens.
///
/// Stored in the token itself (and checked against the verifying secret) so
/// an access token can never be replayed against the refresh endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token for API authorization (default 15 min).
    Access,
    /// Long-lived token for obtaining new access tokens (default 7 days).
    Refresh,
}

/// Claims carried by out-of-band (email-delivered) tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClaims {
    /// The user the token was minted for.
    pub sub: Uuid,

    /// Which out-of-band flow this token belongs to.
    pub kind: OobTokenKind,

    /// Issuer claim.
    pub iss: String,

    /// Expiration time as Unix timestamp.
    pub exp: i64,

    /// Issued at time as Unix timestamp.
    pub iat: i64,

    /// Unique token id, also useful for correlating with the DB row.
    pub jti: Uuid,
}

/// The three out-of-band token kinds.
///
/// Each kind has its own table, TTL, and consumption rule: verification
/// tokens are consumed by deletion; reset and magic-link tokens flip
/// `used = true` and are retained for audit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OobTokenKind {
    /// Email address verification (24 h TTL).
    Verification,
    /// Password reset (1 h TTL).
    PasswordReset,
    /// Passwordless login / silent signup (15 min TTL).
    MagicLink,
}

// =============================================================================
// Token Pair
// =============================================================================

/// A pair of access and refresh tokens returned after authentication.
///
/// The access token goes to the client in the JSON body; the refresh token
/// travels only in the HTTP-only cookie and is rotated on every use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// The access token for API authorization.
    pub access_token: String,

    /// The refresh token; set as an HTTP-only cookie, never in the body.
    pub refresh_token: String,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// Absolute expiry of the refresh token (drives the session row).
    pub refresh_expires_at: DateTime<Utc>,
}

// =============================================================================
// Access / Refresh Codec
// =============================================================================

/// Codec for access and refresh tokens, with independent secrets per kind.
///
/// Created once at startup and shared via `Arc`; keys are immutable after
/// construction.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    config: JwtConfig,
}

impl TokenCodec {
    /// Creates a new codec from the JWT configuration.
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        Self {
            access_encoding,
            access_decoding,
            refresh_encoding,
            refresh_decoding,
            config,
        }
    }

    /// Generates an access + refresh pair for a user.
    ///
    /// Both tokens embed the user's current `(role, token_version)`; the
    /// caller persists the refresh token alongside a session row.
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InternalError` if encoding fails (which shouldn't
    /// happen with valid configuration).
    pub fn generate_pair(
        &self,
        user_id: Uuid,
        role: &str,
        token_version: i32,
    ) -> Result<TokenPair, ApiError> {
        let now = Utc::now();
        let access_token =
            self.generate_token(user_id, role, token_version, TokenType::Access, now)?;
        let refresh_token =
            self.generate_token(user_id, role, token_version, TokenType::Refresh, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_ttl_seconds as i64,
            refresh_expires_at: now
                + Duration::seconds(self.config.refresh_token_ttl_seconds as i64),
        })
    }

    /// Generates a single token of the specified type.
    fn generate_token(
        &self,
        user_id: Uuid,
        role: &str,
        token_version: i32,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<String, ApiError> {
        let (ttl, key) = match token_type {
            TokenType::Access => (
                Duration::seconds(self.config.access_token_ttl_seconds as i64),
                &self.access_encoding,
            ),
            TokenType::Refresh => (
                Duration::seconds(self.config.refresh_token_ttl_seconds as i64),
                &self.refresh_encoding,
            ),
        };

        let claims = Claims {
            sub: user_id,
            role: role.to_string(),
            token_version,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        };

        encode(&Header::default(), &claims, key).map_err(|e| ApiError::InternalError {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validates and decodes an access token.
    ///
    /// Verifies the signature, expiry, issuer, audience, and token type.
    /// The token-version check against the stored user happens in the
    /// caller, which owns the database access.
    ///
    /// ## Errors
    ///
    /// - `ApiError::TokenExpired` - token has expired
    /// - `ApiError::InvalidToken` - malformed, bad signature, or wrong kind
    pub fn verify_access(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.decode_token(token, &self.access_decoding)?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::InvalidToken);
        }

        Ok(claims)
    }

    /// Validates and decodes a refresh token.
    ///
    /// ## Errors
    ///
    /// - `ApiError::TokenExpired` - token has expired
    /// - `ApiError::InvalidToken` - malformed, bad signature, or wrong kind
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.decode_token(token, &self.refresh_decoding)?;

        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::InvalidToken);
        }

        Ok(claims)
    }

    /// Decodes a token against the given key, without checking the type.
    fn decode_token(&self, token: &str, key: &DecodingKey) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data: TokenData<Claims> =
            decode(token, key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header.
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InvalidToken` if the header doesn't start with
    /// `Bearer `.
    pub fn extract_from_header(auth_header: &str) -> Result<&str, ApiError> {
        auth_header
            .strip_prefix("Bearer ")
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::InvalidToken)
    }
}

// Implement Debug manually to avoid exposing keys
impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("config", &"<redacted>")
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Out-of-band Token Codec
// =============================================================================

/// Codec for the email-delivered single-use tokens.
///
/// A separate secret from the access/refresh codecs; the signed claim names
/// the flow kind so a verification token can never redeem a magic-link URL.
#[derive(Clone)]
pub struct EmailTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    config: EmailTokenConfig,
}

impl EmailTokenCodec {
    /// Creates a new codec from the email-token configuration.
    pub fn new(config: EmailTokenConfig, issuer: String) -> Self {
        let encoding = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding = DecodingKey::from_secret(config.secret.as_bytes());

        Self { encoding, decoding, issuer, config }
    }

    /// Returns the configured TTL in seconds for a token kind.
    pub fn ttl_seconds(&self, kind: OobTokenKind) -> u64 {
        match kind {
            OobTokenKind::Verification => self.config.verification_ttl_seconds,
            OobTokenKind::PasswordReset => self.config.reset_ttl_seconds,
            OobTokenKind::MagicLink => self.config.magic_link_ttl_seconds,
        }
    }

    /// Mints a signed token of the given kind.
    ///
    /// Returns the token string and its absolute expiry; the caller persists
    /// the matching row (deleting any prior unused row of the same
    /// `(user, kind)` first).
    pub fn mint(
        &self,
        user_id: Uuid,
        kind: OobTokenKind,
    ) -> Result<(String, DateTime<Utc>), ApiError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_seconds(kind) as i64);

        let claims = EmailClaims {
            sub: user_id,
            kind,
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token =
            encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
                ApiError::InternalError { message: format!("Failed to mint token: {}", e) }
            })?;

        Ok((token, expires_at))
    }

    /// Verifies a token and asserts it belongs to the expected flow.
    ///
    /// ## Errors
    ///
    /// - `ApiError::TokenExpired` - token has expired
    /// - `ApiError::InvalidToken` - malformed, bad signature, or wrong kind
    pub fn verify(&self, token: &str, expected: OobTokenKind) -> Result<EmailClaims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        // Out-of-band tokens carry no audience claim
        validation.validate_aud = false;

        let token_data: TokenData<EmailClaims> = decode(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::InvalidToken,
            })?;

        if token_data.claims.kind != expected {
            return Err(ApiError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for EmailTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailTokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_jwt_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access_secret_minimum_32_chars_long!!".to_string(),
            refresh_secret: "refresh_secret_minimum_32_chars_long!".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604800,
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
        }
    }

    fn test_email_config() -> EmailTokenConfig {
        EmailTokenConfig {
            secret: "email_secret_minimum_32_chars_long!!!".to_string(),
            verification_ttl_seconds: 86400,
            reset_ttl_seconds: 3600,
            magic_link_ttl_seconds: 900,
        }
    }

    #[test]
    fn test_generate_and_verify_access_token() {
        let codec = TokenCodec::new(test_jwt_config());
        let user_id = Uuid::new_v4();

        let pair = codec.generate_pair(user_id, "USER", 3).unwrap();
        let claims = codec.verify_access(&pair.access_token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "USER");
        assert_eq!(claims.token_version, 3);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_generate_and_verify_refresh_token() {
        let codec = TokenCodec::new(test_jwt_config());
        let user_id = Uuid::new_v4();

        let pair = codec.generate_pair(user_id, "ADMIN", 0).unwrap();
        let claims = codec.verify_refresh(&pair.refresh_token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let codec = TokenCodec::new(test_jwt_config());
        let pair = codec.generate_pair(Uuid::new_v4(), "USER", 0).unwrap();

        // Different secret AND different type claim - must fail
        let result = codec.verify_refresh(&pair.access_token);
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let codec = TokenCodec::new(test_jwt_config());
        let pair = codec.generate_pair(Uuid::new_v4(), "USER", 0).unwrap();

        let result = codec.verify_access(&pair.refresh_token);
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_tokens_signed_with_independent_secrets() {
        let config = test_jwt_config();
        let codec = TokenCodec::new(config.clone());
        let pair = codec.generate_pair(Uuid::new_v4(), "USER", 0).unwrap();

        // A codec whose refresh secret equals the access secret must reject
        // the original refresh token.
        let mut crossed = config;
        crossed.refresh_secret = crossed.access_secret.clone();
        let crossed_codec = TokenCodec::new(crossed);

        assert!(crossed_codec.verify_refresh(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_refresh_expiry_is_absolute() {
        let codec = TokenCodec::new(test_jwt_config());
        let before = Utc::now();
        let pair = codec.generate_pair(Uuid::new_v4(), "USER", 0).unwrap();

        let lower = before + Duration::seconds(604800 - 5);
        let upper = Utc::now() + Duration::seconds(604800 + 5);
        assert!(pair.refresh_expires_at > lower && pair.refresh_expires_at < upper);
    }

    #[test]
    fn test_extract_from_header_valid() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let header = format!("Bearer {}", token);

        let extracted = TokenCodec::extract_from_header(&header).unwrap();
        assert_eq!(extracted, token);
    }

    #[test]
    fn test_extract_from_header_invalid() {
        assert!(TokenCodec::extract_from_header("Basic dXNlcjpwYXNz").is_err());
        assert!(TokenCodec::extract_from_header("Bearer ").is_err());
        assert!(TokenCodec::extract_from_header("token-without-scheme").is_err());
    }

    #[test]
    fn test_email_token_roundtrip() {
        let codec = EmailTokenCodec::new(test_email_config(), "test-issuer".to_string());
        let user_id = Uuid::new_v4();

        let (token, expires_at) = codec.mint(user_id, OobTokenKind::MagicLink).unwrap();
        let claims = codec.verify(&token, OobTokenKind::MagicLink).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, OobTokenKind::MagicLink);
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn test_email_token_kind_mismatch_rejected() {
        let codec = EmailTokenCodec::new(test_email_config(), "test-issuer".to_string());

        let (token, _) = codec.mint(Uuid::new_v4(), OobTokenKind::Verification).unwrap();
        let result = codec.verify(&token, OobTokenKind::PasswordReset);

        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_email_token_ttls_per_kind() {
        let codec = EmailTokenCodec::new(test_email_config(), "test-issuer".to_string());

        assert_eq!(codec.ttl_seconds(OobTokenKind::Verification), 86400);
        assert_eq!(codec.ttl_seconds(OobTokenKind::PasswordReset), 3600);
        assert_eq!(codec.ttl_seconds(OobTokenKind::MagicLink), 900);
    }

    #[test]
    fn test_email_token_not_verifiable_by_access_codec() {
        let email_codec = EmailTokenCodec::new(test_email_config(), "test-issuer".to_string());
        let access_codec = TokenCodec::new(test_jwt_config());

        let (token, _) = email_codec.mint(Uuid::new_v4(), OobTokenKind::PasswordReset).unwrap();
        assert!(access_codec.verify_access(&token).is_err());
    }

    #[test]
    fn test_unique_jti_per_mint() {
        let codec = EmailTokenCodec::new(test_email_config(), "test-issuer".to_string());
        let user_id = Uuid::new_v4();

        let (t1, _) = codec.mint(user_id, OobTokenKind::MagicLink).unwrap();
        let (t2, _) = codec.mint(user_id, OobTokenKind::MagicLink).unwrap();

        let c1 = codec.verify(&t1, OobTokenKind::MagicLink).unwrap();
        let c2 = codec.verify(&t2, OobTokenKind::MagicLink).unwrap();
        assert_ne!(c1.jti, c2.jti);
    }
}
