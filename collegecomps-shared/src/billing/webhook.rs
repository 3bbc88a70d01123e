/// Stripe webhook verification and event decoding
///
/// Stripe signs each delivery with a header of the form
/// `t=<unix seconds>,v1=<hex hmac>[,v1=...]`, where the HMAC-SHA256 is taken
/// over `"{t}.{raw body}"` with the endpoint's signing secret. Deliveries
/// older than the tolerance are rejected to limit replay.
///
/// # Example
///
/// ```
/// use collegecomps_shared::billing::webhook::{compute_signature, verify_signature_at};
///
/// let body = r#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#;
/// let sig = compute_signature("whsec_test", 1_700_000_000, body);
/// let header = format!("t=1700000000,v1={}", sig);
///
/// assert!(verify_signature_at(body, &header, "whsec_test", 1_700_000_010).is_ok());
/// ```

use super::BillingError;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;

/// Maximum age of a delivery, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_signature(payload: &str, header: &str, secret: &str) -> Result<(), BillingError> {
    verify_signature_at(payload, header, secret, Utc::now().timestamp())
}

/// Verifies a `Stripe-Signature` header against `now` (unix seconds)
pub fn verify_signature_at(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), BillingError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| BillingError::InvalidSignature("missing timestamp".to_string()))?;

    if signatures.is_empty() {
        return Err(BillingError::InvalidSignature("no v1 signature".to_string()));
    }

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(BillingError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let matched = signatures.iter().any(|candidate| {
        HmacSha256::new_from_slice(secret.as_bytes())
            .map(|mut mac| {
                mac.update(timestamp.to_string().as_bytes());
                mac.update(b".");
                mac.update(payload.as_bytes());
                mac.verify_slice(candidate).is_ok()
            })
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(BillingError::InvalidSignature("signature mismatch".to_string()))
    }
}

/// Raw event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    pub fn user_id(&self) -> Option<i64> {
        self.metadata.get("userId").and_then(|v| v.parse().ok())
    }

    /// Tier from metadata, `premium` when absent
    pub fn tier(&self) -> &str {
        self.metadata
            .get("tier")
            .map(String::as_str)
            .unwrap_or("premium")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<i64>,
}

/// Account state derived from a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub tier: &'static str,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionObject {
    /// Premium while active or trialing. A subscription set to cancel keeps
    /// premium until `current_period_end`, reported as `canceled`.
    pub fn state(&self) -> SubscriptionState {
        let active = matches!(self.status.as_str(), "active" | "trialing");
        let tier = if active { "premium" } else { "free" };

        if self.cancel_at_period_end {
            let expires_at = self
                .current_period_end
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
            SubscriptionState {
                tier,
                status: "canceled".to_string(),
                expires_at,
            }
        } else {
            SubscriptionState {
                tier,
                status: self.status.clone(),
                expires_at: None,
            }
        }
    }
}

/// The events the API acts on
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutSessionObject),
    SubscriptionChanged(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    /// Acknowledged and ignored
    Other(String),
}

/// Decodes a verified payload into a [`WebhookEvent`]
pub fn parse_event(payload: &str) -> Result<WebhookEvent, BillingError> {
    let event: StripeEvent = serde_json::from_str(payload)
        .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;

    fn decode<T: DeserializeOwned>(object: Value) -> Result<T, BillingError> {
        serde_json::from_value(object).map_err(|e| BillingError::InvalidPayload(e.to_string()))
    }

    Ok(match event.event_type.as_str() {
        "checkout.session.completed" => WebhookEvent::CheckoutCompleted(decode(event.data.object)?),
        "customer.subscription.created" | "customer.subscription.updated" => {
            WebhookEvent::SubscriptionChanged(decode(event.data.object)?)
        }
        "customer.subscription.deleted" => {
            WebhookEvent::SubscriptionDeleted(decode(event.data.object)?)
        }
        _ => WebhookEvent::Other(event.event_type),
    })
}
