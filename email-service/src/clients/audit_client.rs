//! # Audit Relay Client
//!
//! Posts audit rows to the auth service's internal endpoint
//! (`POST /auth/internal/audit-log`). The auth service owns the trail; this
//! service only reports what it did.
//!
//! Relay failures are logged and swallowed - the email flow has already
//! completed when the relay fires, and a missing audit row must never fail
//! a delivered email.

use std::time::Duration;
use uuid::Uuid;

/// Timeout for inter-service calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One audit row to relay.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Affected user
    pub user_id: Option<Uuid>,
    /// Action in storage form (e.g. `EMAIL_VERIFIED`)
    pub action: &'static str,
    /// Client IP observed by this service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Client user agent observed by this service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Structured context
    pub metadata: serde_json::Value,
    /// Outcome
    pub success: bool,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditEvent {
    /// Starts a successful event for a user.
    pub fn of(action: &'static str, user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            ip_address: None,
            user_agent: None,
            metadata: serde_json::json!({}),
            success: true,
            error_message: None,
        }
    }

    /// Attaches the request context.
    pub fn with_context(mut self, ctx: &crate::domain::RequestContext) -> Self {
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    /// Attaches structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Client for the auth service's internal audit endpoint.
#[derive(Debug, Clone)]
pub struct AuditClient {
    http: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl AuditClient {
    /// Creates a new client for the given auth service base URL.
    pub fn new(
        auth_base_url: String,
        secret: Option<String>,
    ) -> Result<Self, shared::errors::ApiError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(|e| {
            shared::errors::ApiError::InternalError {
                message: format!("Failed to build HTTP client: {}", e),
            }
        })?;

        let url = format!(
            "{}/auth/internal/audit-log",
            auth_base_url.trim_end_matches('/')
        );

        Ok(Self { http, url, secret })
    }

    /// Relays one audit event. Never fails the caller.
    pub async fn record(&self, event: AuditEvent) {
        let mut request = self.http.post(&self.url).json(&event);
        if let Some(secret) = &self.secret {
            request = request.header("X-Internal-Secret", secret);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    action = event.action,
                    status = %response.status(),
                    "Audit relay rejected"
                );
            }
            Err(e) => {
                tracing::warn!(action = event.action, error = %e, "Audit relay unreachable");
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_record_posts_event_with_secret_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/internal/audit-log"))
            .and(header("X-Internal-Secret", "hunter2"))
            .and(body_partial_json(serde_json::json!({ "action": "EMAIL_VERIFIED" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuditClient::new(server.uri(), Some("hunter2".to_string())).unwrap();
        client.record(AuditEvent::of("EMAIL_VERIFIED", Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn test_record_swallows_failures() {
        // Nothing mounted: every call 404s, and record still returns.
        let server = MockServer::start().await;
        let client = AuditClient::new(server.uri(), None).unwrap();

        client.record(AuditEvent::of("RESET_EMAIL_SENT", Uuid::new_v4())).await;
    }

    #[test]
    fn test_event_builder() {
        let user_id = Uuid::new_v4();
        let event = AuditEvent::of("VERIFICATION_EMAIL_SENT", user_id)
            .with_metadata(serde_json::json!({ "email": "a@example.com" }));

        assert_eq!(event.user_id, Some(user_id));
        assert!(event.success);
        assert_eq!(event.metadata["email"], "a@example.com");
    }
}
