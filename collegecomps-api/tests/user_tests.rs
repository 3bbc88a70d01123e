/// Integration tests for the account endpoints: profile, usage counters,
/// onboarding, the questionnaire and alert preferences

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_profile_merges_fields() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let empty = ctx.get("/api/user/profile", Some(&token)).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert!(empty.body["profile"].is_null());

    let first = ctx
        .put(
            "/api/user/profile",
            json!({ "name": "  Sam Student ", "gpa": 3.8, "sat": 1400 }),
            Some(&token),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.text);
    assert_eq!(first.body["name"], "Sam Student");

    // Omitted fields keep their value, a blank name is ignored
    let second = ctx
        .put("/api/user/profile", json!({ "name": "   ", "act": 31 }), Some(&token))
        .await;
    assert_eq!(second.status, StatusCode::OK, "{}", second.text);

    let profile = ctx.get("/api/user/profile", Some(&token)).await;
    assert_eq!(profile.body["profile"]["gpa"], 3.8);
    assert_eq!(profile.body["profile"]["sat"], 1400);
    assert_eq!(profile.body["profile"]["act"], 31);

    let me = ctx.get("/api/user/me", Some(&token)).await;
    assert_eq!(me.body["name"], "Sam Student");
}

#[tokio::test]
async fn test_usage_stats() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.premium_user().await.unwrap();
    let token = ctx.token_for(&user);

    let zero = ctx.get("/api/user/usage-stats", Some(&token)).await;
    assert_eq!(zero.status, StatusCode::OK, "{}", zero.text);
    assert_eq!(
        zero.body,
        json!({
            "saved_comparisons": 0,
            "exports_this_month": 0,
            "alerts_configured": 0,
            "folders_created": 0,
        })
    );

    let created = ctx
        .post(
            "/api/saved-comparisons",
            json!({ "name": "Shortlist", "colleges": [{ "unitid": 100654 }] }),
            Some(&token),
        )
        .await;
    let comparison_id = created.body["id"].as_i64().unwrap();
    ctx.post("/api/exports/share", json!({ "comparisonId": comparison_id }), Some(&token))
        .await;
    ctx.post("/api/comparison-folders", json!({ "name": "Reach" }), Some(&token))
        .await;
    ctx.post(
        "/api/alerts/preferences",
        json!({
            "preferences": [
                { "id": "salary", "type": "Salary Data Updates", "enabled": true },
                { "id": "roi", "type": "ROI Changes", "enabled": true },
                { "id": "careers", "type": "Career Insights", "enabled": false },
            ],
        }),
        Some(&token),
    )
    .await;

    let stats = ctx.get("/api/user/usage-stats", Some(&token)).await;
    assert_eq!(stats.body["saved_comparisons"], 1);
    assert_eq!(stats.body["exports_this_month"], 1);
    assert_eq!(stats.body["alerts_configured"], 2);
    assert_eq!(stats.body["folders_created"], 1);
}

#[tokio::test]
async fn test_onboarding() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let before = ctx.get("/api/user/onboarding", Some(&token)).await;
    assert_eq!(before.status, StatusCode::OK, "{}", before.text);
    assert_eq!(before.body["onboarding_completed"], false);
    assert!(before.body["preferences"].is_null());

    let saved = ctx
        .post(
            "/api/user/onboarding",
            json!({
                "intended_major": "Computer Science",
                "degree_level": "bachelors",
                "target_schools": ["Georgia Tech", "Purdue"],
                "expected_graduation_year": 2029,
            }),
            Some(&token),
        )
        .await;
    assert_eq!(saved.status, StatusCode::OK, "{}", saved.text);
    assert_eq!(saved.body["message"], "Onboarding preferences saved successfully");

    let after = ctx.get("/api/user/onboarding", Some(&token)).await;
    assert_eq!(after.body["onboarding_completed"], true);
    assert_eq!(after.body["preferences"]["intended_major"], "Computer Science");
    assert_eq!(after.body["preferences"]["target_schools"], json!(["Georgia Tech", "Purdue"]));
    assert_eq!(after.body["preferences"]["preferred_programs"], json!([]));

    // Saving again replaces the answers
    ctx.post(
        "/api/user/onboarding",
        json!({ "intended_major": "Mathematics" }),
        Some(&token),
    )
    .await;
    let replaced = ctx.get("/api/user/onboarding", Some(&token)).await;
    assert_eq!(replaced.body["preferences"]["intended_major"], "Mathematics");
    assert_eq!(replaced.body["preferences"]["target_schools"], json!([]));
    assert!(replaced.body["preferences"]["expected_graduation_year"].is_null());
}

#[tokio::test]
async fn test_questionnaire_responses() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let none = ctx.get("/api/user/responses", Some(&token)).await;
    assert_eq!(none.status, StatusCode::OK);
    assert!(none.body["responses"].is_null());

    let created = ctx
        .post(
            "/api/user/responses",
            json!({
                "gpa": 3.6,
                "sat_score": 1350,
                "zip_code": "94110",
                "parent_income": 85000,
                "preferred_states": "CA",
                "preferred_major": "Biology",
            }),
            Some(&token),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    assert_eq!(created.body["message"], "Responses saved successfully");

    let updated = ctx
        .put(
            "/api/user/responses",
            json!({ "gpa": 3.7, "preferred_states": ["CA", "OR"] }),
            Some(&token),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.text);
    assert_eq!(updated.body["message"], "Responses updated successfully");

    let stored = ctx.get("/api/user/responses", Some(&token)).await;
    let responses = &stored.body["responses"];
    assert_eq!(responses["gpa"], 3.7);
    assert_eq!(responses["preferred_states"], json!(["CA", "OR"]));
    // Every save replaces the full answer set
    assert!(responses["sat_score"].is_null());
    assert!(responses["preferred_major"].is_null());

    let deleted = ctx.delete("/api/user/responses", None, Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Responses deleted successfully");

    let gone = ctx.get("/api/user/responses", Some(&token)).await;
    assert!(gone.body["responses"].is_null());
}

#[tokio::test]
async fn test_alert_preferences_are_premium() {
    let ctx = TestContext::new().await.unwrap();
    let free = ctx.random_user().await.unwrap();
    let premium = ctx.premium_user().await.unwrap();

    let refused = ctx
        .get("/api/alerts/preferences", Some(&ctx.token_for(&free)))
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
    assert_eq!(refused.body["message"], "Premium subscription required");

    let token = ctx.token_for(&premium);
    let defaults = ctx.get("/api/alerts/preferences", Some(&token)).await;
    assert_eq!(defaults.status, StatusCode::OK, "{}", defaults.text);
    assert!(defaults.body["preferences"].is_null());
    assert_eq!(defaults.body["frequency"], "instant");

    let missing = ctx
        .post("/api/alerts/preferences", json!({ "frequency": "daily" }), Some(&token))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Preferences are required");

    let bad_frequency = ctx
        .post(
            "/api/alerts/preferences",
            json!({ "preferences": [], "frequency": "hourly" }),
            Some(&token),
        )
        .await;
    assert_eq!(bad_frequency.status, StatusCode::BAD_REQUEST);

    let alerts = json!([{ "id": "roi", "type": "ROI Changes", "enabled": true }]);
    let saved = ctx
        .post(
            "/api/alerts/preferences",
            json!({ "preferences": alerts, "frequency": "weekly" }),
            Some(&token),
        )
        .await;
    assert_eq!(saved.status, StatusCode::OK, "{}", saved.text);
    assert_eq!(saved.body["message"], "Alert preferences saved successfully");

    let stored = ctx.get("/api/alerts/preferences", Some(&token)).await;
    assert_eq!(stored.body["preferences"], alerts);
    assert_eq!(stored.body["frequency"], "weekly");
}
