/// Transactional email delivery
///
/// Every outbound email goes through the [`Mailer`] trait so the API server
/// can swap providers without touching route code.
///
/// # Implementations
///
/// - [`ResendMailer`]: delivers through the Resend HTTP API
/// - [`OutboxMailer`]: keeps messages in memory and logs them; used when no
///   provider key is configured and by tests
///
/// # Example
///
/// ```no_run
/// use collegecomps_shared::email::{Mailer, OutboxMailer, OutgoingEmail};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = OutboxMailer::new();
/// mailer.send(OutgoingEmail::new("student@example.com", "Hello", "<p>Hi</p>")).await?;
/// assert_eq!(mailer.sent().len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod outbox;
pub mod resend;
pub mod templates;

pub use outbox::OutboxMailer;
pub use resend::ResendMailer;

use async_trait::async_trait;
use serde::Serialize;

/// Email delivery errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// The provider could not be reached
    #[error("Email transport failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status
    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The mailer is misconfigured
    #[error("Email configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        EmailError::Transport(err.to_string())
    }
}

/// A fully rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            reply_to: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

/// Something that can deliver an [`OutgoingEmail`]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Delivers one message
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}
