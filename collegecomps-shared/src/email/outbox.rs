/// In-memory mailer
///
/// Records every message instead of delivering it. The API server falls back
/// to this when `RESEND_API_KEY` is unset so local sign-ups and resets still
/// work; the links can be read from the log.

use super::{EmailError, Mailer, OutgoingEmail};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct OutboxMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: bool,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails, for exercising error paths
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    /// Snapshot of everything sent so far
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Most recent message addressed to `to`
    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|e| e.to == to)
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Transport("outbox configured to fail".to_string()));
        }

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email captured in outbox (no provider configured)"
        );
        tracing::debug!(html = %email.html, "Outbox email body");

        self.sent
            .lock()
            .map_err(|_| EmailError::Transport("outbox lock poisoned".to_string()))?
            .push(email);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_messages() {
        let mailer = OutboxMailer::new();
        let clone = mailer.clone();

        mailer
            .send(OutgoingEmail::new("a@example.com", "One", "<p>1</p>"))
            .await
            .unwrap();
        mailer
            .send(OutgoingEmail::new("a@example.com", "Two", "<p>2</p>"))
            .await
            .unwrap();

        assert_eq!(clone.sent().len(), 2);
        assert_eq!(clone.last_to("a@example.com").unwrap().subject, "Two");
        assert!(clone.last_to("b@example.com").is_none());
    }

    #[tokio::test]
    async fn test_failing_mailer() {
        let mailer = OutboxMailer::failing();
        let result = mailer.send(OutgoingEmail::new("a@example.com", "x", "y")).await;
        assert!(result.is_err());
        assert!(mailer.sent().is_empty());
    }
}
