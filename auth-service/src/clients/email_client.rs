//! # Email Service Client
//!
//! Thin HTTP client for the email service's internal endpoints. The two
//! services share a database but cooperate over HTTP for dispatch: auth
//! asks email to send, email asks auth to audit.
//!
//! Calls carry a 5 second timeout; the services are expected to be
//! reachable only on a private network, so no auth header travels with
//! these requests.

use shared::errors::ApiError;
use std::time::Duration;
use uuid::Uuid;

/// Timeout for inter-service calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the email service.
#[derive(Debug, Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    base_url: String,
}

impl EmailClient {
    /// Creates a new client for the given base URL.
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::InternalError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Asks the email service to mint and dispatch a verification token.
    pub async fn send_verification(&self, user_id: Uuid, email: &str) -> Result<(), ApiError> {
        self.post(
            "/email/send-verification",
            &serde_json::json!({ "userId": user_id, "email": email }),
        )
        .await
    }

    /// Asks the email service to dispatch an already-minted magic link.
    pub async fn send_magic_link(
        &self,
        email: &str,
        token: &str,
        is_new_user: bool,
    ) -> Result<(), ApiError> {
        self.post(
            "/email/send-magic-link",
            &serde_json::json!({ "email": email, "token": token, "isNewUser": is_new_user }),
        )
        .await
    }

    /// Shared POST with the dependency-error mapping.
    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<(), ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Email service unreachable");
            ApiError::Dependency { service: "email-service".to_string() }
        })?;

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Email service rejected call");
            return Err(ApiError::Dependency { service: "email-service".to_string() });
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_verification_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email/send-verification"))
            .and(body_partial_json(serde_json::json!({ "email": "a@example.com" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmailClient::new(server.uri()).unwrap();
        let result = client.send_verification(Uuid::new_v4(), "a@example.com").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_magic_link_carries_new_user_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email/send-magic-link"))
            .and(body_partial_json(serde_json::json!({ "isNewUser": true })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmailClient::new(server.uri()).unwrap();
        let result = client.send_magic_link("a@example.com", "tok", true).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_non_success_maps_to_dependency_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email/send-verification"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = EmailClient::new(server.uri()).unwrap();
        let result = client.send_verification(Uuid::new_v4(), "a@example.com").await;

        assert!(matches!(result, Err(ApiError::Dependency { .. })));
    }
}
