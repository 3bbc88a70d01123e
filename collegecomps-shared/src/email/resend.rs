/// Resend HTTP API mailer

use super::{EmailError, Mailer, OutgoingEmail};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Delivers email through `POST https://api.resend.com/emails`
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, EmailError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(EmailError::Configuration("Resend API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key,
            from: from.into(),
            endpoint: RESEND_API_URL.to_string(),
        })
    }

    /// Points the mailer at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn name(&self) -> &str {
        "resend"
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let body = SendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            reply_to: email.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}
