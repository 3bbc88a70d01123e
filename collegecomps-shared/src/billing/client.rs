/// Minimal Stripe REST client
///
/// Stripe takes `application/x-www-form-urlencoded` bodies with bracketed
/// keys for nested fields (`line_items[0][price]`). Each POST carries a fresh
/// `Idempotency-Key`.

use super::{BillingCycle, BillingError};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

/// Inputs for a subscription checkout session
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub price_id: &'a str,
    pub customer_email: &'a str,
    pub user_id: i64,
    pub tier: &'a str,
    pub cycle: BillingCycle,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl CheckoutRequest<'_> {
    /// Form fields for `POST /v1/checkout/sessions`
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let user_id = self.user_id.to_string();
        vec![
            ("mode", "subscription".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price]", self.price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("customer_email", self.customer_email.to_string()),
            ("metadata[userId]", user_id.clone()),
            ("metadata[tier]", self.tier.to_string()),
            ("metadata[billingCycle]", self.cycle.as_str().to_string()),
            ("subscription_data[metadata][userId]", user_id),
        ]
    }
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Result<Self, BillingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            http,
            secret_key: secret_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
        })
    }

    /// Points the client at a different API base, e.g. stripe-mock
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, BillingError> {
        self.post_form("checkout/sessions", &request.form()).await
    }

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        let form = vec![
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];
        self.post_form("billing_portal/sessions", &form).await
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> Result<T, BillingError> {
        let url = format!("{}/{}", self.api_base, path);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "unknown error".to_string());

            tracing::error!(status = status.as_u16(), path, %message, "Stripe request failed");
            return Err(BillingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_form_fields() {
        let request = CheckoutRequest {
            price_id: "price_123",
            customer_email: "sam@example.com",
            user_id: 42,
            tier: "premium",
            cycle: BillingCycle::Annual,
            success_url: "https://www.collegecomps.com/subscription?success=true".to_string(),
            cancel_url: "https://www.collegecomps.com/pricing?canceled=true".to_string(),
        };

        let form = request.form();
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(get("line_items[0][price]"), Some("price_123"));
        assert_eq!(get("metadata[userId]"), Some("42"));
        assert_eq!(get("metadata[billingCycle]"), Some("annual"));
        assert_eq!(get("subscription_data[metadata][userId]"), Some("42"));
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let client = StripeClient::new("sk_test").unwrap().with_api_base("http://localhost:12111/v1/");
        assert_eq!(client.api_base, "http://localhost:12111/v1");
    }
}
