//! # Email Templates
//!
//! The three transactional templates, rendered in-process with string
//! substitution. Each takes the action link and a display name; the magic
//! link template additionally varies its greeting and security notice for
//! brand-new accounts.
//!
//! Templates are presentation, not policy - the flows stay correct
//! whatever these render.

use crate::service::mailer::OutboundEmail;

/// Shared layout skeleton. Body content and accent color vary per template.
fn layout(title: &str, accent: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            text-align: center;
            padding: 20px 0;
            border-bottom: 1px solid #eee;
        }}
        .content {{ padding: 30px 0; }}
        .button {{
            display: inline-block;
            background-color: {accent};
            color: white !important;
            text-decoration: none;
            padding: 12px 30px;
            border-radius: 6px;
            font-weight: 600;
            margin: 20px 0;
        }}
        .link {{ word-break: break-all; color: {accent}; }}
        .notice {{
            background-color: #F9FAFB;
            border: 1px solid #E5E7EB;
            border-radius: 6px;
            padding: 15px;
            margin: 20px 0;
        }}
        .footer {{
            text-align: center;
            padding: 20px 0;
            border-top: 1px solid #eee;
            color: #666;
            font-size: 14px;
        }}
    </style>
</head>
<body>
    <div class="header"><h1>Gatehouse</h1></div>
    <div class="content">{content}</div>
    <div class="footer">
        <p>This is an automated message, please do not reply.</p>
    </div>
</body>
</html>"#
    )
}

/// Renders the email verification message.
///
/// Takes `{link, display_name}`.
pub fn verification_email(link: &str, display_name: &str) -> OutboundEmail {
    let content = format!(
        r#"<h2>Verify your email address</h2>
<p>Hi {display_name},</p>
<p>Please confirm this address so you can sign in to your account:</p>
<p style="text-align: center;"><a href="{link}" class="button">Verify email</a></p>
<p>Or copy and paste this link into your browser:</p>
<p class="link">{link}</p>
<p><strong>This link expires in 24 hours.</strong></p>
<p>If you did not create an account, you can safely ignore this email.</p>"#
    );

    let text = format!(
        "Verify your email address\n\n\
         Hi {display_name},\n\n\
         Please confirm this address so you can sign in to your account:\n\n\
         {link}\n\n\
         This link expires in 24 hours.\n\n\
         If you did not create an account, you can safely ignore this email."
    );

    OutboundEmail {
        to: String::new(),
        subject: "Verify your email address".to_string(),
        html_body: layout("Verify your email", "#4F46E5", &content),
        text_body: text,
    }
}

/// Renders the password reset message.
///
/// Takes `{link, display_name}`.
pub fn password_reset_email(link: &str, display_name: &str) -> OutboundEmail {
    let content = format!(
        r#"<h2>Reset your password</h2>
<p>Hi {display_name},</p>
<p>We received a request to reset your password. Click below to choose a new one:</p>
<p style="text-align: center;"><a href="{link}" class="button">Reset password</a></p>
<p>Or copy and paste this link into your browser:</p>
<p class="link">{link}</p>
<p><strong>This link expires in 1 hour and can be used once.</strong></p>
<div class="notice">
    <strong>Security notice:</strong> if you did not request this reset,
    ignore this email - your password is unchanged. Completing the reset
    signs you out everywhere.
</div>"#
    );

    let text = format!(
        "Reset your password\n\n\
         Hi {display_name},\n\n\
         We received a request to reset your password. Use this link to choose a new one:\n\n\
         {link}\n\n\
         This link expires in 1 hour and can be used once.\n\n\
         SECURITY NOTICE: if you did not request this reset, ignore this email - \
         your password is unchanged. Completing the reset signs you out everywhere."
    );

    OutboundEmail {
        to: String::new(),
        subject: "Reset your password".to_string(),
        html_body: layout("Reset your password", "#DC2626", &content),
        text_body: text,
    }
}

/// Renders the magic-link message.
///
/// Takes `{link, display_name, is_new_user}`: new accounts get a welcome
/// greeting and a signup-flavored security notice.
pub fn magic_link_email(link: &str, display_name: &str, is_new_user: bool) -> OutboundEmail {
    let (greeting, notice) = if is_new_user {
        (
            format!("Welcome, {display_name}! Your account is ready - sign in with the link below."),
            "You're receiving this because this address was used to create an account. \
             If that wasn't you, ignore this email and no account will ever be usable.",
        )
    } else {
        (
            format!("Hi {display_name}, here is your sign-in link."),
            "If you did not request this link, ignore this email - \
             nobody can sign in without it.",
        )
    };

    let content = format!(
        r#"<h2>Your sign-in link</h2>
<p>{greeting}</p>
<p style="text-align: center;"><a href="{link}" class="button">Sign in</a></p>
<p>Or copy and paste this link into your browser:</p>
<p class="link">{link}</p>
<p><strong>This link expires in 15 minutes and can be used once.</strong></p>
<div class="notice"><strong>Security notice:</strong> {notice}</div>"#
    );

    let text = format!(
        "Your sign-in link\n\n\
         {greeting}\n\n\
         {link}\n\n\
         This link expires in 15 minutes and can be used once.\n\n\
         SECURITY NOTICE: {notice}"
    );

    OutboundEmail {
        to: String::new(),
        subject: "Your sign-in link".to_string(),
        html_body: layout("Your sign-in link", "#059669", &content),
        text_body: text,
    }
}

/// Derives a display name from an email address (the local part).
pub fn display_name(email: &str) -> &str {
    email.split('@').next().filter(|s| !s.is_empty()).unwrap_or("there")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_template_embeds_link() {
        let email = verification_email("https://app.example/verify-email?token=abc", "alice");

        assert!(email.html_body.contains("https://app.example/verify-email?token=abc"));
        assert!(email.text_body.contains("https://app.example/verify-email?token=abc"));
        assert!(email.html_body.contains("alice"));
        assert!(email.html_body.contains("24 hours"));
    }

    #[test]
    fn test_reset_template_warns_about_session_termination() {
        let email = password_reset_email("https://app.example/reset?token=abc", "bob");

        assert!(email.html_body.contains("signs you out everywhere"));
        assert!(email.text_body.contains("signs you out everywhere"));
        assert!(email.html_body.contains("1 hour"));
    }

    #[test]
    fn test_magic_link_greeting_varies_for_new_users() {
        let link = "https://app.example/magic?token=abc";

        let new_user = magic_link_email(link, "carol", true);
        let returning = magic_link_email(link, "carol", false);

        assert!(new_user.html_body.contains("Welcome"));
        assert!(!returning.html_body.contains("Welcome"));
        assert_ne!(new_user.html_body, returning.html_body);
        assert_ne!(new_user.text_body, returning.text_body);

        // Both still carry the link and the one-shot warning
        for email in [&new_user, &returning] {
            assert!(email.html_body.contains(link));
            assert!(email.html_body.contains("15 minutes"));
        }
    }

    #[test]
    fn test_display_name_is_local_part() {
        assert_eq!(display_name("alice@example.com"), "alice");
        assert_eq!(display_name("no-at-sign"), "no-at-sign");
        assert_eq!(display_name("@example.com"), "there");
    }
}
