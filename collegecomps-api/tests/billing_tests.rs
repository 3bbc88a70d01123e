/// Integration tests for the Stripe webhook and unsubscribe links

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use collegecomps_shared::auth::tokens::sign_unsubscribe_token;
use collegecomps_shared::billing::webhook::compute_signature;
use collegecomps_shared::models::user::User;
use common::{TestContext, JWT_SECRET, WEBHOOK_SECRET};
use serde_json::{json, Value};

fn signed_webhook(payload: &Value, secret: &str) -> Request<Body> {
    let body = payload.to_string();
    let timestamp = Utc::now().timestamp();
    let signature = format!("t={},v1={}", timestamp, compute_signature(secret, timestamp, &body));

    Request::builder()
        .method("POST")
        .uri("/api/stripe/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

fn checkout_completed(user_id: i64, customer: &str) -> Value {
    json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test",
            "customer": customer,
            "subscription": "sub_test",
            "metadata": { "userId": user_id.to_string(), "tier": "premium" },
        }},
    })
}

#[tokio::test]
async fn test_webhook_upgrades_and_downgrades() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();

    let response = ctx
        .send(signed_webhook(&checkout_completed(user.id, "cus_abc"), WEBHOOK_SECRET))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["received"], true);

    let upgraded = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(upgraded.subscription_tier, "premium");
    assert_eq!(upgraded.subscription_status, "active");
    assert_eq!(upgraded.stripe_customer_id.as_deref(), Some("cus_abc"));

    let cancel_at = Utc::now().timestamp() + 86_400;
    let canceling = json!({
        "id": "evt_update",
        "type": "customer.subscription.updated",
        "data": { "object": {
            "id": "sub_test",
            "customer": "cus_abc",
            "status": "active",
            "cancel_at_period_end": true,
            "current_period_end": cancel_at,
        }},
    });
    let response = ctx.send(signed_webhook(&canceling, WEBHOOK_SECRET)).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);

    let canceled = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(canceled.subscription_tier, "premium");
    assert_eq!(canceled.subscription_status, "canceled");
    assert_eq!(
        canceled.subscription_expires_at.map(|t| t.timestamp()),
        Some(cancel_at)
    );

    let deleted = json!({
        "id": "evt_delete",
        "type": "customer.subscription.deleted",
        "data": { "object": { "id": "sub_test", "customer": "cus_abc", "status": "canceled" }},
    });
    let response = ctx.send(signed_webhook(&deleted, WEBHOOK_SECRET)).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);

    let downgraded = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(downgraded.subscription_tier, "free");
    assert_eq!(downgraded.subscription_status, "expired");
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();

    let response = ctx
        .send(signed_webhook(&checkout_completed(user.id, "cus_abc"), "whsec_wrong"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let unchanged = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(unchanged.subscription_tier, "free");
}

#[tokio::test]
async fn test_webhook_requires_signature_header() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .post("/api/stripe/webhook", json!({ "type": "ping" }), None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Missing stripe-signature header");
}

#[tokio::test]
async fn test_webhook_acknowledges_other_events() {
    let ctx = TestContext::new().await.unwrap();

    let event = json!({ "id": "evt_other", "type": "invoice.paid", "data": { "object": {} } });
    let response = ctx.send(signed_webhook(&event, WEBHOOK_SECRET)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["received"], true);
}

#[tokio::test]
async fn test_checkout_without_stripe_keys() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let invalid = ctx
        .post(
            "/api/stripe/checkout",
            json!({ "tier": "gold", "billingCycle": "monthly" }),
            Some(&token),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let unconfigured = ctx
        .post(
            "/api/stripe/checkout",
            json!({ "tier": "premium", "billingCycle": "annual" }),
            Some(&token),
        )
        .await;
    assert_eq!(unconfigured.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unsubscribe_link() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = sign_unsubscribe_token(JWT_SECRET, user.id);

    let forged = ctx
        .get(&format!("/api/unsubscribe?user={}&token={}", user.id + 1, token), None)
        .await;
    assert_eq!(forged.status, StatusCode::SEE_OTHER);
    assert!(forged.headers[header::LOCATION]
        .to_str()
        .unwrap()
        .ends_with("/unsubscribe?error=invalid"));

    let response = ctx
        .get(&format!("/api/unsubscribe?user={}&token={}", user.id, token), None)
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers[header::LOCATION],
        "http://localhost:3000/unsubscribe?success=true"
    );

    let user = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert!(!user.email_preferences.marketing);
    assert!(!user.email_preferences.product_updates);
    assert!(!user.email_preferences.weekly_digest);
}

#[tokio::test]
async fn test_update_preferences() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();

    let missing = ctx
        .post("/api/unsubscribe", json!({ "preferences": { "marketing": false } }), None)
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let forged = ctx
        .post(
            "/api/unsubscribe",
            json!({ "userId": user.id, "token": "00", "preferences": { "marketing": false } }),
            None,
        )
        .await;
    assert_eq!(forged.status, StatusCode::FORBIDDEN);

    let response = ctx
        .post(
            "/api/unsubscribe",
            json!({
                "userId": user.id,
                "token": sign_unsubscribe_token(JWT_SECRET, user.id),
                "preferences": { "marketing": false },
            }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["message"], "Preferences updated successfully");

    let user = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert!(!user.email_preferences.marketing);
    assert!(user.email_preferences.product_updates);
}
