/// Email templates
///
/// Each builder returns a rendered [`OutgoingEmail`]. All of them share one
/// layout whose footer carries a signed unsubscribe link for the recipient.
/// User-supplied text (names, ticket subjects, replies) is HTML-escaped.

use super::OutgoingEmail;
use crate::auth::tokens::sign_unsubscribe_token;

/// Site-wide values every template needs
#[derive(Debug, Clone)]
pub struct EmailContext {
    /// Public site origin, without a trailing slash
    pub base_url: String,
    /// Secret used to sign unsubscribe links
    pub unsubscribe_secret: String,
    /// Address ticket replies should go to
    pub support_email: String,
}

/// The recipient of a user-facing email
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub user_id: i64,
    pub email: &'a str,
    pub name: Option<&'a str>,
}

impl Recipient<'_> {
    fn greeting_name(&self) -> String {
        match self.name.map(str::trim) {
            Some(name) if !name.is_empty() => escape_html(name),
            _ => "there".to_string(),
        }
    }
}

impl EmailContext {
    pub fn new(
        base_url: impl Into<String>,
        unsubscribe_secret: impl Into<String>,
        support_email: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            unsubscribe_secret: unsubscribe_secret.into(),
            support_email: support_email.into(),
        }
    }

    /// `{base}/api/unsubscribe?user={id}&token={hmac}`
    pub fn unsubscribe_url(&self, user_id: i64) -> String {
        format!(
            "{}/api/unsubscribe?user={}&token={}",
            self.base_url,
            user_id,
            sign_unsubscribe_token(&self.unsubscribe_secret, user_id)
        )
    }

    pub fn verification_url(&self, token: &str) -> String {
        format!("{}/auth/verify-email?token={}", self.base_url, token)
    }

    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/auth/reset-password?token={}", self.base_url, token)
    }

    pub fn ticket_url(&self, ticket_id: i64) -> String {
        format!("{}/support?ticket={}", self.base_url, ticket_id)
    }

    /// Sent after sign-up, carrying the email verification link
    pub fn welcome(&self, to: Recipient<'_>, verification_token: &str) -> OutgoingEmail {
        let url = self.verification_url(verification_token);
        let body = format!(
            r#"<h2>Welcome to CollegeComps!</h2>
<p>Hi {name},</p>
<p>Thank you for joining CollegeComps! We're excited to help you make data-driven decisions about your college education.</p>
<p>To get started, please verify your email address:</p>
{button}
<p>If the button doesn't work, copy and paste this link into your browser:</p>
<p>{url}</p>"#,
            name = to.greeting_name(),
            button = button(&url, "Verify Email Address"),
            url = url,
        );

        OutgoingEmail::new(
            to.email,
            "Welcome to CollegeComps! Please verify your email",
            self.layout(to.user_id, &body),
        )
    }

    pub fn password_reset(&self, to: Recipient<'_>, reset_token: &str) -> OutgoingEmail {
        let url = self.reset_url(reset_token);
        let body = format!(
            r#"<h2>Reset Your Password</h2>
<p>Hi {name},</p>
<p>We received a request to reset your password for your CollegeComps account.</p>
{button}
<p>If the button doesn't work, copy and paste this link into your browser:</p>
<p>{url}</p>
<p><strong>This link expires in 1 hour</strong> and only works once.</p>
<p>If you didn't request a password reset, you can safely ignore this email. Your password will not be changed.</p>"#,
            name = to.greeting_name(),
            button = button(&url, "Reset Password"),
            url = url,
        );

        OutgoingEmail::new(
            to.email,
            "Reset your CollegeComps password",
            self.layout(to.user_id, &body),
        )
    }

    pub fn verification_reminder(&self, to: Recipient<'_>, verification_token: &str) -> OutgoingEmail {
        let url = self.verification_url(verification_token);
        let body = format!(
            r#"<h2>Please verify your email</h2>
<p>Hi {name},</p>
<p>Verify your email address to unlock every CollegeComps feature. This link expires in 24 hours.</p>
{button}
<p>{url}</p>"#,
            name = to.greeting_name(),
            button = button(&url, "Verify Email Address"),
            url = url,
        );

        OutgoingEmail::new(
            to.email,
            "Please verify your email address",
            self.layout(to.user_id, &body),
        )
    }

    /// Confirmation for a newly opened ticket; replies go to support
    pub fn ticket_confirmation(
        &self,
        to: Recipient<'_>,
        ticket_id: i64,
        subject: &str,
        category: &str,
        priority: &str,
    ) -> OutgoingEmail {
        let body = format!(
            r#"<h2>Support Ticket Created</h2>
<p>Hi {name},</p>
<p>Your support ticket has been created with ticket number <strong>#{id}</strong>.</p>
<p><strong>Subject:</strong> {subject}<br>
<strong>Category:</strong> {category}<br>
<strong>Priority:</strong> {priority}</p>
<p>Our support team will review your ticket and respond {window}.</p>
{button}
<p>You can reply to this email to add more information. Your response will be added to ticket #{id}.</p>"#,
            name = to.greeting_name(),
            id = ticket_id,
            subject = escape_html(subject),
            category = escape_html(category),
            priority = escape_html(&priority.to_uppercase()),
            window = response_window(priority),
            button = button(&self.ticket_url(ticket_id), "View Ticket"),
        );

        OutgoingEmail::new(
            to.email,
            format!("[Ticket #{}] {}", ticket_id, subject),
            self.layout(to.user_id, &body),
        )
        .with_reply_to(self.support_email.clone())
    }

    /// Notification of a new reply on a ticket
    pub fn ticket_reply(
        &self,
        to: Recipient<'_>,
        ticket_id: i64,
        subject: &str,
        message: &str,
        from_staff: bool,
    ) -> OutgoingEmail {
        let who = if from_staff {
            "Our support team has"
        } else {
            "You have"
        };
        let body = format!(
            r#"<h2>New Reply to Your Ticket</h2>
<p>Hi {name},</p>
<p>{who} added a new reply to ticket <strong>#{id}</strong>.</p>
<p><strong>Ticket:</strong> {subject}</p>
<p style="white-space: pre-wrap;">{message}</p>
{button}
<p>Reply to this email to add your response to ticket #{id}.</p>"#,
            name = to.greeting_name(),
            who = who,
            id = ticket_id,
            subject = escape_html(subject),
            message = escape_html(message),
            button = button(&self.ticket_url(ticket_id), "View Full Conversation"),
        );

        OutgoingEmail::new(
            to.email,
            format!("Re: [Ticket #{}] {}", ticket_id, subject),
            self.layout(to.user_id, &body),
        )
        .with_reply_to(self.support_email.clone())
    }

    fn layout(&self, user_id: i64, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333;">
<div style="max-width: 600px; margin: 20px auto; padding: 30px;">
{body}
<hr>
<p style="color: #6c757d; font-size: 12px;">CollegeComps. <a href="{unsubscribe}">Unsubscribe</a> from these emails.</p>
</div>
</body>
</html>"#,
            body = body,
            unsubscribe = self.unsubscribe_url(user_id),
        )
    }
}

fn response_window(priority: &str) -> &'static str {
    match priority {
        "high" | "urgent" => "within 4 hours",
        "normal" => "within 24 hours",
        _ => "within 48 hours",
    }
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<p style="text-align: center;"><a href="{}" style="display: inline-block; padding: 12px 30px; background: #667eea; color: #ffffff; text-decoration: none; border-radius: 6px;">{}</a></p>"#,
        href, label
    )
}

/// Escapes the five HTML-significant characters
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::verify_unsubscribe_token;

    fn ctx() -> EmailContext {
        EmailContext::new("https://www.collegecomps.com/", "unsubscribe-secret", "support@collegecomps.com")
    }

    fn recipient() -> Recipient<'static> {
        Recipient {
            user_id: 7,
            email: "sam@example.com",
            name: Some("Sam <b>"),
        }
    }

    #[test]
    fn test_unsubscribe_url_is_signed() {
        let ctx = ctx();
        let url = ctx.unsubscribe_url(7);
        assert!(url.starts_with("https://www.collegecomps.com/api/unsubscribe?user=7&token="));

        let token = url.rsplit("token=").next().unwrap();
        assert!(verify_unsubscribe_token("unsubscribe-secret", 7, token));
        assert!(!verify_unsubscribe_token("unsubscribe-secret", 8, token));
    }

    #[test]
    fn test_reset_email_contains_link_and_footer() {
        let email = ctx().password_reset(recipient(), "abc123");
        assert_eq!(email.to, "sam@example.com");
        assert!(email.html.contains("https://www.collegecomps.com/auth/reset-password?token=abc123"));
        assert!(email.html.contains("/api/unsubscribe?user=7&token="));
        assert!(email.html.contains("Sam &lt;b&gt;"));
        assert!(email.reply_to.is_none());
    }

    #[test]
    fn test_ticket_emails_reply_to_support() {
        let confirmation = ctx().ticket_confirmation(recipient(), 42, "Login issue", "account", "low");
        assert_eq!(confirmation.subject, "[Ticket #42] Login issue");
        assert_eq!(confirmation.reply_to.as_deref(), Some("support@collegecomps.com"));
        assert!(confirmation.html.contains("within 48 hours"));

        let reply = ctx().ticket_reply(recipient(), 42, "Login issue", "Try <this>", true);
        assert_eq!(reply.subject, "Re: [Ticket #42] Login issue");
        assert!(reply.html.contains("Try &lt;this&gt;"));
        assert!(reply.html.contains("Our support team has"));
    }

    #[test]
    fn test_greeting_falls_back() {
        let r = Recipient {
            user_id: 1,
            email: "x@example.com",
            name: Some("  "),
        };
        assert!(ctx().welcome(r, "t").html.contains("Hi there,"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
