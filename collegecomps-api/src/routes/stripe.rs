/// Stripe billing
///
/// # Endpoints
///
/// - `POST /api/stripe/checkout` - Start a premium checkout session
/// - `POST /api/stripe/portal` - Open the customer billing portal
/// - `POST /api/stripe/webhook` - Stripe event receiver (signature checked, no session)
///
/// The webhook is the only writer of subscription state. Checkout and the
/// portal only hand the browser a Stripe URL.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::non_blank,
};
use axum::{extract::State, http::HeaderMap, Extension, Json};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    billing::{
        webhook::{parse_event, verify_signature, WebhookEvent},
        BillingCycle, CheckoutRequest, StripeClient,
    },
    models::user::{SubscriptionUpdate, User},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub tier: Option<String>,
    pub billing_cycle: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

fn stripe_client(state: &AppState) -> ApiResult<&StripeClient> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Stripe not configured".to_string()))
}

/// Start a checkout session for the premium plan
///
/// # Errors
///
/// - `400 Bad Request`: Tier other than `premium`, or unknown billing cycle
/// - `503 Service Unavailable`: Stripe keys not configured
pub async fn checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<Json<CheckoutResponse>> {
    let invalid = || ApiError::BadRequest("Invalid subscription tier or billing cycle".to_string());

    let tier = non_blank(&body.tier).ok_or_else(invalid)?;
    if tier != "premium" {
        return Err(invalid());
    }
    let cycle = non_blank(&body.billing_cycle)
        .and_then(BillingCycle::parse)
        .ok_or_else(invalid)?;

    let client = stripe_client(&state)?;
    let price_id = state.prices.premium_price(cycle)?;
    let base = state.config.api.base_url.trim_end_matches('/');

    let session = client
        .create_checkout_session(&CheckoutRequest {
            price_id,
            customer_email: &auth.email,
            user_id: auth.user_id,
            tier,
            cycle,
            success_url: format!("{}/subscription?success=true", base),
            cancel_url: format!("{}/pricing?canceled=true", base),
        })
        .await?;

    tracing::info!(user_id = auth.user_id, %cycle, session_id = %session.id, "Checkout session created");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Open the billing portal for the caller's Stripe customer
pub async fn portal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let client = stripe_client(&state)?;

    let customer_id = User::find_by_id(&state.db, auth.user_id)
        .await?
        .and_then(|user| user.stripe_customer_id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::NotFound("No active subscription found".to_string()))?;

    let return_url = format!("{}/subscription", state.config.api.base_url.trim_end_matches('/'));
    let session = client.create_portal_session(&customer_id, &return_url).await?;

    Ok(Json(json!({ "url": session.url })))
}

/// Stripe webhook receiver
///
/// The raw body is needed for signature verification, so it is taken as a
/// `String` rather than `Json`.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid `Stripe-Signature`, or undecodable payload
/// - `503 Service Unavailable`: Webhook secret not configured
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing stripe-signature header".to_string()))?;

    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::ServiceUnavailable("Webhook secret not configured".to_string()))?;

    verify_signature(&body, signature, secret).map_err(|e| {
        tracing::warn!(error = %e, "Rejected Stripe webhook");
        ApiError::from(e)
    })?;

    match parse_event(&body)? {
        WebhookEvent::CheckoutCompleted(session) => {
            let Some(user_id) = session.user_id() else {
                tracing::warn!(session_id = %session.id, "Checkout session without userId metadata");
                return Ok(Json(json!({ "received": true })));
            };

            User::update_subscription(
                &state.db,
                user_id,
                SubscriptionUpdate {
                    tier: session.tier().to_string(),
                    status: "active".to_string(),
                    expires_at: None,
                    stripe_customer_id: session.customer.clone(),
                },
            )
            .await?;

            tracing::info!(user_id, tier = session.tier(), "Checkout completed");
        }
        WebhookEvent::SubscriptionChanged(subscription) => {
            match User::find_by_stripe_customer(&state.db, &subscription.customer).await? {
                Some(user) => {
                    let next = subscription.state();
                    User::update_subscription(
                        &state.db,
                        user.id,
                        SubscriptionUpdate {
                            tier: next.tier.to_string(),
                            status: next.status.clone(),
                            expires_at: next.expires_at,
                            stripe_customer_id: None,
                        },
                    )
                    .await?;

                    tracing::info!(
                        user_id = user.id,
                        tier = next.tier,
                        status = %next.status,
                        expires_at = ?next.expires_at,
                        "Subscription updated"
                    );
                }
                None => {
                    tracing::warn!(customer = %subscription.customer, "Subscription event for unknown customer");
                }
            }
        }
        WebhookEvent::SubscriptionDeleted(subscription) => {
            match User::find_by_stripe_customer(&state.db, &subscription.customer).await? {
                Some(user) => {
                    User::update_subscription(
                        &state.db,
                        user.id,
                        SubscriptionUpdate {
                            tier: "free".to_string(),
                            status: "expired".to_string(),
                            expires_at: None,
                            stripe_customer_id: None,
                        },
                    )
                    .await?;

                    tracing::info!(user_id = user.id, "Subscription ended");
                }
                None => {
                    tracing::warn!(customer = %subscription.customer, "Deletion event for unknown customer");
                }
            }
        }
        WebhookEvent::Other(event_type) => {
            tracing::debug!(%event_type, "Ignoring Stripe event");
        }
    }

    Ok(Json(json!({ "received": true })))
}
