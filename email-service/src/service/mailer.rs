//! # Mail Sender
//!
//! SMTP transport abstraction over lettre.
//!
//! ## Transport Selection
//!
//! | `EMAIL_SECURE` | Transport |
//! |----------------|-----------|
//! | `true` | Implicit TLS (`relay`, typically port 465) |
//! | `false` | STARTTLS upgrade (`starttls_relay`, typically port 587) |
//! | no `SMTP_HOST` | Disabled - sends are logged, not delivered (dev mode) |
//!
//! ## Startup Behavior
//!
//! The transport is created once and verified at startup; a failed
//! connectivity check is logged and the process keeps serving - reads stay
//! available and later sends retry against the relay. A failed send
//! surfaces to the caller as `MAIL_DISPATCH_FAILED`.

use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use shared::config::SmtpConfig;
use shared::errors::ApiError;
use std::time::Duration;
use tracing::{info, warn};

/// Timeout for one SMTP conversation.
const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

/// A rendered email ready for dispatch.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
    /// Plain-text alternative
    pub text_body: String,
}

/// SMTP transport abstraction.
///
/// Created once at startup and shared; lettre's transport is safe to
/// invoke concurrently.
#[derive(Clone)]
pub struct MailSender {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl MailSender {
    /// Creates the sender, building the transport if SMTP is configured.
    pub fn new(config: SmtpConfig) -> Result<Self, ApiError> {
        if config.host.is_empty() {
            warn!("SMTP not configured - outbound mail will be logged, not delivered");
            return Ok(Self { config, transport: None });
        }

        let transport = Self::build_transport(&config)?;

        info!(
            host = %config.host,
            port = config.port,
            secure = config.secure,
            "SMTP transport initialized"
        );

        Ok(Self { config, transport: Some(transport) })
    }

    fn build_transport(
        config: &SmtpConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, ApiError> {
        let mut builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| ApiError::InternalError {
            message: format!("Failed to create SMTP transport: {}", e),
        })?;

        builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// Verifies relay connectivity at startup.
    ///
    /// The outcome is logged either way; a failure never aborts startup.
    pub async fn verify_connectivity(&self) {
        let Some(transport) = &self.transport else {
            info!("SMTP disabled - skipping connectivity check");
            return;
        };

        match transport.test_connection().await {
            Ok(true) => info!(host = %self.config.host, "SMTP connectivity verified"),
            Ok(false) => warn!(host = %self.config.host, "SMTP relay refused the handshake"),
            Err(e) => warn!(host = %self.config.host, error = %e, "SMTP connectivity check failed"),
        }
    }

    /// Dispatches one email.
    ///
    /// ## Errors
    ///
    /// `ApiError::MailDispatch` when the relay rejects or is unreachable.
    pub async fn send(&self, email: OutboundEmail) -> Result<(), ApiError> {
        let Some(transport) = &self.transport else {
            info!(to = %email.to, subject = %email.subject, "[dev] Email suppressed (SMTP disabled)");
            return Ok(());
        };

        let message = self.build_message(&email)?;

        match transport.send(message).await {
            Ok(response) => {
                info!(to = %email.to, subject = %email.subject, code = ?response.code(), "Email sent");
                Ok(())
            }
            Err(e) => {
                warn!(to = %email.to, subject = %email.subject, error = %e, "Email dispatch failed");
                Err(ApiError::MailDispatch { message: e.to_string() })
            }
        }
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, ApiError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| ApiError::InternalError {
                message: format!("Invalid from address: {}", e),
            })?;

        let to: Mailbox = email.to.parse().map_err(|_| ApiError::BadRequest {
            message: "invalid recipient address".to_string(),
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| ApiError::InternalError {
                message: format!("Failed to build email: {}", e),
            })
    }
}

impl std::fmt::Debug for MailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSender")
            .field("host", &self.config.host)
            .field("enabled", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_sender() -> MailSender {
        MailSender::new(SmtpConfig {
            host: String::new(),
            port: 587,
            secure: false,
            username: None,
            password: None,
            from_email: "no-reply@gatehouse.local".to_string(),
            from_name: "Gatehouse".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_disabled_transport_suppresses_sends() {
        let sender = disabled_sender();

        let result = sender
            .send(OutboundEmail {
                to: "a@example.com".to_string(),
                subject: "Test".to_string(),
                html_body: "<p>hi</p>".to_string(),
                text_body: "hi".to_string(),
            })
            .await;

        assert!(result.is_ok());
    }

    #[test]
    fn test_message_building_rejects_bad_recipient() {
        let sender = disabled_sender();

        let result = sender.build_message(&OutboundEmail {
            to: "definitely not an address".to_string(),
            subject: "Test".to_string(),
            html_body: String::new(),
            text_body: String::new(),
        });

        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
    }

    #[test]
    fn test_message_builds_multipart() {
        let sender = disabled_sender();

        let message = sender
            .build_message(&OutboundEmail {
                to: "a@example.com".to_string(),
                subject: "Verify your email".to_string(),
                html_body: "<p>link</p>".to_string(),
                text_body: "link".to_string(),
            })
            .unwrap();

        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("multipart/alternative"));
        assert!(rendered.contains("Verify your email"));
    }
}
