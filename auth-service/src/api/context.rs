//! # Request Context and Cookie Helpers
//!
//! Extraction of client context from incoming requests, and construction of
//! the refresh-token cookie.
//!
//! ## Client IP Resolution
//!
//! In order of preference:
//!
//! 1. `X-Forwarded-For` - first entry (set by the edge proxy)
//! 2. `X-Real-IP`
//! 3. The peer socket address
//!
//! ## Refresh Cookie Policy
//!
//! | Attribute | Development | Production |
//! |-----------|-------------|------------|
//! | `HttpOnly` | yes | yes |
//! | `Path` | `/` | `/` |
//! | `SameSite` | `Lax` | `None` |
//! | `Secure` | no | yes |
//!
//! The cookie name is configurable (`REFRESH_COOKIE_NAME`, default `jid`).

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::domain::RequestContext;

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// Builds the client context for an incoming request.
pub fn request_context(req: &HttpRequest) -> RequestContext {
    RequestContext { ip_address: client_ip(req), user_agent: user_agent(req) }
}

/// Resolves the client IP: `X-Forwarded-For[0]`, then `X-Real-IP`, then the
/// socket peer.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded) = header(req, "X-Forwarded-For") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    if let Some(real_ip) = header(req, "X-Real-IP") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    req.peer_addr().map(|addr| addr.ip().to_string())
}

/// Reads the raw `User-Agent` header.
pub fn user_agent(req: &HttpRequest) -> Option<String> {
    header(req, "User-Agent")
}

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(String::from)
}

// =============================================================================
// REFRESH COOKIE
// =============================================================================

/// Reads the refresh token from the configured cookie, if present.
pub fn refresh_token_from_cookie(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.cookie(cookie_name).map(|c| c.value().to_string())
}

/// Builds the refresh-token cookie for a freshly issued credential.
pub fn refresh_cookie(
    cookie_name: &str,
    token: &str,
    max_age_seconds: i64,
    production: bool,
) -> Cookie<'static> {
    Cookie::build(cookie_name.to_string(), token.to_string())
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

/// Builds an expired cookie that clears the refresh token.
pub fn clear_refresh_cookie(cookie_name: &str, production: bool) -> Cookie<'static> {
    Cookie::build(cookie_name.to_string(), String::new())
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .max_age(CookieDuration::ZERO)
        .finish()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1, 10.0.0.2"))
            .insert_header(("X-Real-IP", "10.9.9.9"))
            .to_http_request();

        assert_eq!(client_ip(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = TestRequest::default()
            .insert_header(("X-Real-IP", "198.51.100.4"))
            .to_http_request();

        assert_eq!(client_ip(&req).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn test_no_headers_no_peer_yields_none() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(client_ip(&req), None);
    }

    #[test]
    fn test_refresh_cookie_attributes_development() {
        let cookie = refresh_cookie("jid", "token-value", 604800, false);

        assert_eq!(cookie.name(), "jid");
        assert_eq!(cookie.value(), "token-value");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_refresh_cookie_attributes_production() {
        let cookie = refresh_cookie("jid", "token-value", 604800, true);

        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_refresh_cookie("jid", false);

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }

    #[test]
    fn test_request_context_collects_user_agent() {
        let req = TestRequest::default()
            .insert_header(("User-Agent", "curl/8.0"))
            .to_http_request();

        let ctx = request_context(&req);
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
    }
}
