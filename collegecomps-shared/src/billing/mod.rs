/// Stripe billing
///
/// - [`client`]: checkout and customer-portal sessions over the Stripe REST API
/// - [`webhook`]: `Stripe-Signature` verification and typed events
///
/// Only one paid tier exists (`premium`) with monthly and annual prices.

pub mod client;
pub mod webhook;

pub use client::{CheckoutRequest, CheckoutSession, PortalSession, StripeClient};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// No price id is configured for the requested cycle
    #[error("Price ID not configured for this subscription")]
    PriceNotConfigured,

    /// Stripe could not be reached
    #[error("Stripe request failed: {0}")]
    Transport(String),

    /// Stripe answered with an error
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Webhook signature header is malformed or does not match
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),

    /// Webhook payload could not be decoded
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        BillingError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(BillingCycle::Monthly),
            "annual" => Some(BillingCycle::Annual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stripe price ids for the premium plan
#[derive(Debug, Clone, Default)]
pub struct PriceCatalog {
    pub premium_monthly: Option<String>,
    pub premium_annual: Option<String>,
}

impl PriceCatalog {
    /// Price id for a cycle, treating blank values as unset
    pub fn premium_price(&self, cycle: BillingCycle) -> Result<&str, BillingError> {
        let price = match cycle {
            BillingCycle::Monthly => self.premium_monthly.as_deref(),
            BillingCycle::Annual => self.premium_annual.as_deref(),
        };

        price
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(BillingError::PriceNotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_cycle_parse() {
        assert_eq!(BillingCycle::parse("monthly"), Some(BillingCycle::Monthly));
        assert_eq!(BillingCycle::parse("annual"), Some(BillingCycle::Annual));
        assert_eq!(BillingCycle::parse("weekly"), None);
        assert_eq!(BillingCycle::Annual.to_string(), "annual");
    }

    #[test]
    fn test_price_catalog() {
        let catalog = PriceCatalog {
            premium_monthly: Some("price_monthly".to_string()),
            premium_annual: Some("  ".to_string()),
        };
        assert_eq!(catalog.premium_price(BillingCycle::Monthly).unwrap(), "price_monthly");
        assert!(matches!(
            catalog.premium_price(BillingCycle::Annual),
            Err(BillingError::PriceNotConfigured)
        ));
    }
}
