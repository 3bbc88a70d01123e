/// Integration tests for saved comparisons, share links and bookmarks

mod common;

use axum::http::{header, StatusCode};
use common::TestContext;
use serde_json::{json, Value};

fn comparison_body(name: &str) -> Value {
    json!({
        "name": name,
        "colleges": [{ "unitid": 100654, "name": "Alabama A & M University" }],
        "notes": "Visit in spring",
    })
}

#[tokio::test]
async fn test_free_tier_comparison_limit() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let first = ctx
        .post("/api/saved-comparisons", comparison_body("First"), Some(&token))
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.text);

    let second = ctx
        .post("/api/saved-comparisons", comparison_body("Second"), Some(&token))
        .await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);

    let list = ctx.get("/api/saved-comparisons", Some(&token)).await;
    assert_eq!(list.body["comparisons"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_premium_saves_without_limit() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.premium_user().await.unwrap();
    let token = ctx.token_for(&user);

    for name in ["One", "Two", "Three"] {
        let response = ctx
            .post("/api/saved-comparisons", comparison_body(name), Some(&token))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    }
}

#[tokio::test]
async fn test_comparison_requires_name_and_colleges() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let response = ctx
        .post("/api/saved-comparisons", json!({ "name": "No colleges" }), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Name and colleges are required");
}

#[tokio::test]
async fn test_cannot_delete_another_users_comparison() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.random_user().await.unwrap();
    let other = ctx.random_user().await.unwrap();

    let created = ctx
        .post("/api/saved-comparisons", comparison_body("Mine"), Some(&ctx.token_for(&owner)))
        .await;
    let id = created.body["id"].as_i64().unwrap();

    let response = ctx
        .delete(
            &format!("/api/saved-comparisons?id={}", id),
            None,
            Some(&ctx.token_for(&other)),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .delete(
            &format!("/api/saved-comparisons?id={}", id),
            None,
            Some(&ctx.token_for(&owner)),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_folders_and_tags_are_premium() {
    let ctx = TestContext::new().await.unwrap();
    let free = ctx.random_user().await.unwrap();
    let premium = ctx.premium_user().await.unwrap();

    let response = ctx
        .post("/api/comparison-folders", json!({ "name": "Reach" }), Some(&ctx.token_for(&free)))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let token = ctx.token_for(&premium);
    let folder = ctx
        .post("/api/comparison-folders", json!({ "name": "Reach" }), Some(&token))
        .await;
    assert_eq!(folder.status, StatusCode::OK, "{}", folder.text);
    let folder_id = folder.body["id"].as_i64().unwrap();

    let created = ctx
        .post("/api/saved-comparisons", comparison_body("Tagged"), Some(&token))
        .await;
    let comparison_id = created.body["id"].as_i64().unwrap();

    let moved = ctx
        .post(
            "/api/saved-comparisons/move",
            json!({ "comparisonId": comparison_id, "folderId": folder_id }),
            Some(&token),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.text);

    let tagged = ctx
        .post(
            "/api/saved-comparisons/tags",
            json!({ "comparisonId": comparison_id, "tag": "affordable" }),
            Some(&token),
        )
        .await;
    assert_eq!(tagged.status, StatusCode::OK, "{}", tagged.text);
    assert_eq!(tagged.body["tags"], json!(["affordable"]));

    let folders = ctx.get("/api/comparison-folders", Some(&token)).await;
    assert_eq!(folders.body["folders"][0]["comparison_count"], 1);
}

#[tokio::test]
async fn test_share_link_is_stable() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.premium_user().await.unwrap();
    let token = ctx.token_for(&user);

    let created = ctx
        .post("/api/saved-comparisons", comparison_body("Shared"), Some(&token))
        .await;
    let comparison_id = created.body["id"].as_i64().unwrap();

    let first = ctx
        .post("/api/exports/share", json!({ "comparisonId": comparison_id }), Some(&token))
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.text);
    assert_eq!(first.body["message"], "Share link created successfully");

    let second = ctx
        .post("/api/exports/share", json!({ "comparisonId": comparison_id }), Some(&token))
        .await;
    assert_eq!(second.body["message"], "Share link already exists");
    assert_eq!(first.body["shareToken"], second.body["shareToken"]);

    let share_token = first.body["shareToken"].as_str().unwrap();
    let view = ctx.get(&format!("/api/exports/share/{}", share_token), None).await;
    assert_eq!(view.status, StatusCode::OK, "{}", view.text);
    assert_eq!(view.body["comparison"]["name"], "Shared");
    assert!(view.body["comparison"].get("user_id").is_none());
}

#[tokio::test]
async fn test_expired_share_link() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.premium_user().await.unwrap();
    let token = ctx.token_for(&user);

    let created = ctx
        .post("/api/saved-comparisons", comparison_body("Old"), Some(&token))
        .await;
    let comparison_id = created.body["id"].as_i64().unwrap();

    let share = ctx
        .post("/api/exports/share", json!({ "comparisonId": comparison_id }), Some(&token))
        .await;
    let share_token = share.body["shareToken"].as_str().unwrap().to_string();

    sqlx::query("UPDATE shared_comparisons SET expires_at = datetime('now', '-1 day')")
        .execute(&ctx.db)
        .await
        .unwrap();

    let view = ctx.get(&format!("/api/exports/share/{}", share_token), None).await;
    assert_eq!(view.status, StatusCode::GONE);

    // Asking again renews the same link
    let renewed = ctx
        .post("/api/exports/share", json!({ "comparisonId": comparison_id }), Some(&token))
        .await;
    assert_eq!(renewed.body["shareToken"], share_token.as_str());

    let view = ctx.get(&format!("/api/exports/share/{}", share_token), None).await;
    assert_eq!(view.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_share_token() {
    let ctx = TestContext::new().await.unwrap();

    let view = ctx.get("/api/exports/share/deadbeef", None).await;
    assert_eq!(view.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_csv_export() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.premium_user().await.unwrap();
    let token = ctx.token_for(&user);

    let created = ctx
        .post("/api/saved-comparisons", comparison_body("Export me"), Some(&token))
        .await;
    let comparison_id = created.body["id"].as_i64().unwrap();

    let csv = ctx
        .post(
            "/api/exports/comparison",
            json!({ "comparisonId": comparison_id, "format": "csv" }),
            Some(&token),
        )
        .await;
    assert_eq!(csv.status, StatusCode::OK, "{}", csv.text);
    assert!(csv.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(csv.text.contains("Alabama A & M University"));

    let pdf = ctx
        .post(
            "/api/exports/comparison",
            json!({ "comparisonId": comparison_id, "format": "pdf" }),
            Some(&token),
        )
        .await;
    assert_eq!(pdf.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bookmarks() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&user);

    let anonymous = ctx.get("/api/bookmarks/colleges/check?unitid=100654", None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(anonymous.body["isBookmarked"], false);

    let body = json!({ "unitid": 100654, "action": "add", "institution_name": "Alabama A & M University" });
    let added = ctx.post("/api/bookmarks/colleges", body.clone(), Some(&token)).await;
    assert_eq!(added.status, StatusCode::OK, "{}", added.text);

    let duplicate = ctx.post("/api/bookmarks/colleges", body, Some(&token)).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let check = ctx
        .get("/api/bookmarks/colleges/check?unitid=100654", Some(&token))
        .await;
    assert_eq!(check.body["isBookmarked"], true);

    // Anonymous callers still get false for a bookmarked college
    let anonymous = ctx.get("/api/bookmarks/colleges/check?unitid=100654", None).await;
    assert_eq!(anonymous.body["isBookmarked"], false);

    let missing = ctx.get("/api/bookmarks/colleges/check", Some(&token)).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let removed = ctx
        .post(
            "/api/bookmarks/colleges",
            json!({ "unitid": 100654, "action": "remove" }),
            Some(&token),
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let list = ctx.get("/api/bookmarks/colleges", Some(&token)).await;
    assert_eq!(list.body["bookmarks"], json!([]));
}
