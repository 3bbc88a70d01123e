/// Integration tests for signup, login, password changes and email
/// verification

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use collegecomps_shared::auth::password::is_bcrypt_hash;
use collegecomps_shared::auth::tokens::hash_token;
use collegecomps_shared::models::user::User;
use common::{TestContext, TEST_PASSWORD};
use serde_json::json;

/// Pulls the raw token out of an emailed reset link
fn reset_token_from(html: &str) -> Option<String> {
    token_after(html, "reset-password?token=")
}

/// Pulls the raw token out of an emailed verification link
fn verification_token_from(html: &str) -> Option<String> {
    token_after(html, "verify-email?token=")
}

fn token_after(html: &str, marker: &str) -> Option<String> {
    let start = html.find(marker)? + marker.len();
    let token: String = html[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    (!token.is_empty()).then_some(token)
}

#[tokio::test]
async fn test_signup_then_login() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .post(
            "/api/auth/signup",
            json!({ "email": "New.User@Example.com", "password": "long-enough-pw", "name": "New" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    assert_eq!(response.body["message"], "Account created successfully");

    let user = User::find_by_email(&ctx.db, "new.user@example.com")
        .await
        .unwrap()
        .expect("user stored with normalized email");
    assert!(!user.email_verified);
    assert!(ctx.outbox.last_to("new.user@example.com").is_some(), "welcome email sent");

    let response = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "NEW.USER@example.com", "password": "long-enough-pw" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["token_type"], "Bearer");

    let token = response.body["access_token"].as_str().unwrap().to_string();
    let me = ctx.get("/api/user/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK, "{}", me.text);
    assert_eq!(me.body["email"], "new.user@example.com");
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .post(
            "/api/auth/signup",
            json!({ "email": "short@example.com", "password": "short" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(User::find_by_email(&ctx.db, "short@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_signup_rejects_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("taken@example.com").await.unwrap();

    let response = ctx
        .post(
            "/api/auth/signup",
            json!({ "email": "Taken@Example.com", "password": "long-enough-pw" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "User already exists");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("login@example.com").await.unwrap();

    let response = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "login@example.com", "password": "not-the-password" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_required() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.get("/api/saved-comparisons", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx.get("/api/saved-comparisons", Some("not-a-jwt")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("known@example.com").await.unwrap();

    let known = ctx
        .post("/api/auth/forgot-password", json!({ "email": "known@example.com" }), None)
        .await;
    let unknown = ctx
        .post("/api/auth/forgot-password", json!({ "email": "nobody@example.com" }), None)
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.status, unknown.status);
    assert_eq!(known.body, unknown.body);

    assert!(ctx.outbox.last_to("known@example.com").is_some());
    assert!(ctx.outbox.last_to("nobody@example.com").is_none());
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("reset@example.com").await.unwrap();

    ctx.post("/api/auth/forgot-password", json!({ "email": "reset@example.com" }), None)
        .await;

    let email = ctx.outbox.last_to("reset@example.com").expect("reset email");
    let token = reset_token_from(&email.html).expect("token in reset link");

    let response = ctx
        .post(
            "/api/auth/reset-password",
            json!({ "token": token, "password": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["message"], "Password has been reset successfully");

    let old = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "reset@example.com", "password": TEST_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "reset@example.com", "password": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);

    // Tokens are single use
    let again = ctx
        .post(
            "/api/auth/reset-password",
            json!({ "token": token, "password": "another-password" }),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_reset_token_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("stale@example.com").await.unwrap();

    let raw = "a".repeat(64);
    User::set_reset_token(&ctx.db, user.id, &hash_token(&raw), Utc::now() - Duration::minutes(61))
        .await
        .unwrap();

    let response = ctx
        .post(
            "/api/auth/reset-password",
            json!({ "token": raw, "password": "brand-new-password" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Reset token has expired");
}

#[tokio::test]
async fn test_login_with_bcrypt_hash() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("legacy@example.com").await.unwrap();

    let legacy = bcrypt::hash(TEST_PASSWORD, 4).unwrap().replacen("$2b$", "$2a$", 1);
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&legacy)
        .bind(user.id)
        .execute(&ctx.db)
        .await
        .unwrap();

    let wrong = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "legacy@example.com", "password": "not-the-password" }),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED, "{}", wrong.text);

    let right = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "legacy@example.com", "password": TEST_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(right.status, StatusCode::OK, "{}", right.text);

    // Changing the password moves the row to Argon2id
    let token = right.body["access_token"].as_str().unwrap().to_string();
    let changed = ctx
        .put(
            "/api/user/password",
            json!({ "currentPassword": TEST_PASSWORD, "newPassword": "fresh-argon-password" }),
            Some(&token),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{}", changed.text);

    let stored = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    let hash = stored.password_hash.unwrap();
    assert!(!is_bcrypt_hash(&hash));
    assert!(hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_change_password() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("changer@example.com").await.unwrap();
    let token = ctx.token_for(&user);

    let missing = ctx
        .put("/api/user/password", json!({ "newPassword": "long-enough-pw" }), Some(&token))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let short = ctx
        .put(
            "/api/user/password",
            json!({ "currentPassword": TEST_PASSWORD, "newPassword": "7chars!" }),
            Some(&token),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["message"], "New password must be at least 8 characters");

    let wrong = ctx
        .put(
            "/api/user/password",
            json!({ "currentPassword": "not-the-password", "newPassword": "long-enough-pw" }),
            Some(&token),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Current password is incorrect");

    let changed = ctx
        .put(
            "/api/user/password",
            json!({ "currentPassword": TEST_PASSWORD, "newPassword": "exactly8" }),
            Some(&token),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{}", changed.text);

    let login = ctx
        .post(
            "/api/auth/login",
            json!({ "email": "changer@example.com", "password": "exactly8" }),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_email_from_welcome_link() {
    let ctx = TestContext::new().await.unwrap();

    ctx.post(
        "/api/auth/signup",
        json!({ "email": "verify@example.com", "password": "long-enough-pw" }),
        None,
    )
    .await;

    let welcome = ctx.outbox.last_to("verify@example.com").expect("welcome email");
    let token = verification_token_from(&welcome.html).expect("token in verification link");

    let response = ctx
        .get(&format!("/api/auth/verify-email?token={}", token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["success"], true);

    let user = User::find_by_email(&ctx.db, "verify@example.com").await.unwrap().unwrap();
    assert!(user.email_verified);

    // The token is cleared once used
    let reused = ctx
        .get(&format!("/api/auth/verify-email?token={}", token), None)
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_email_edge_cases() {
    let ctx = TestContext::new().await.unwrap();

    let missing = ctx.get("/api/auth/verify-email", None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let unknown = ctx.get("/api/auth/verify-email?token=deadbeef", None).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let stale = ctx.create_user("stale-verify@example.com").await.unwrap();
    let raw = "b".repeat(64);
    User::set_verification_token(&ctx.db, stale.id, &hash_token(&raw), Utc::now() - Duration::hours(25))
        .await
        .unwrap();
    let expired = ctx
        .get(&format!("/api/auth/verify-email?token={}", raw), None)
        .await;
    assert_eq!(expired.status, StatusCode::BAD_REQUEST);
    assert!(expired.body["message"].as_str().unwrap().contains("expired"));

    let done = ctx.create_user("done@example.com").await.unwrap();
    User::mark_email_verified(&ctx.db, done.id).await.unwrap();
    let raw = "c".repeat(64);
    User::set_verification_token(&ctx.db, done.id, &hash_token(&raw), Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    let already = ctx
        .get(&format!("/api/auth/verify-email?token={}", raw), None)
        .await;
    assert_eq!(already.status, StatusCode::OK);
    assert_eq!(already.body["alreadyVerified"], true);
}

#[tokio::test]
async fn test_resend_verification() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("resend@example.com").await.unwrap();
    let token = ctx.token_for(&user);

    let anonymous = ctx.post("/api/auth/resend-verification", json!({}), None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let response = ctx.post("/api/auth/resend-verification", json!({}), Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);

    let reminder = ctx.outbox.last_to("resend@example.com").expect("reminder email");
    let raw = verification_token_from(&reminder.html).expect("token in reminder");
    let verified = ctx
        .get(&format!("/api/auth/verify-email?token={}", raw), None)
        .await;
    assert_eq!(verified.status, StatusCode::OK, "{}", verified.text);

    let again = ctx.post("/api/auth/resend-verification", json!({}), Some(&token)).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["message"], "Email already verified");
}
