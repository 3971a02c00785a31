//! # Service Layer
//!
//! Business logic of the email service: the out-of-band token flows, the
//! SMTP transport, template rendering, and background cleanup.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `email_service` | Verification / reset flows, magic-link dispatch |
//! | `mailer` | lettre SMTP transport + startup connectivity check |
//! | `templates` | The three transactional HTML/text templates |
//! | `sweeper` | Hourly expired-token cleanup |

pub mod email_service;
pub mod mailer;
pub mod sweeper;
pub mod templates;

pub use email_service::EmailFlowService;
pub use mailer::MailSender;
