//! Common test utilities for integration tests
//!
//! Each [`TestContext`] owns a fresh in-memory database with migrations
//! applied, a router wired to an [`OutboxMailer`], and helpers for creating
//! accounts and sending requests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use collegecomps_api::app::{build_router, AppState};
use collegecomps_api::config::{ApiConfig, Config, DatabaseConfig, EmailConfig, JwtConfig, StripeConfig};
use collegecomps_shared::auth::jwt::{create_token, Claims};
use collegecomps_shared::auth::password::hash_password;
use collegecomps_shared::db::migrations::run_migrations;
use collegecomps_shared::db::pool::{self, create_pool};
use collegecomps_shared::email::OutboxMailer;
use collegecomps_shared::models::user::{CreateUser, SubscriptionUpdate, User};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            cors_origins: vec!["*".to_string()],
            production: false,
            admin_email_domain: "staff.collegecomps.com".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            college_url: None,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        email: EmailConfig {
            resend_api_key: None,
            from: "noreply@collegecomps.com".to_string(),
            support_email: "support@collegecomps.com".to_string(),
        },
        stripe: StripeConfig {
            secret_key: None,
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            premium_monthly_price_id: Some("price_monthly".to_string()),
            premium_annual_price_id: Some("price_annual".to_string()),
        },
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub app: Router,
    pub outbox: OutboxMailer,
    pub config: Config,
}

/// A decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestContext {
    /// Creates a context with a fresh database
    pub async fn new() -> anyhow::Result<Self> {
        Self::build(None).await
    }

    /// Creates a context whose router also reads `college` as the college
    /// facts database
    pub async fn with_college_db(college: SqlitePool) -> anyhow::Result<Self> {
        Self::build(Some(college)).await
    }

    async fn build(college: Option<SqlitePool>) -> anyhow::Result<Self> {
        let config = test_config();

        let db = create_pool(pool::DatabaseConfig::in_memory()).await?;
        run_migrations(&db).await?;

        let outbox = OutboxMailer::new();
        let mut state =
            AppState::new(db.clone(), config.clone())?.with_mailer(Arc::new(outbox.clone()));
        if let Some(college) = college {
            state = state.with_college_db(college);
        }
        let app = build_router(state);

        Ok(Self {
            db,
            app,
            outbox,
            config,
        })
    }

    /// Creates a credentials account with [`TEST_PASSWORD`]
    pub async fn create_user(&self, email: &str) -> anyhow::Result<User> {
        let user = User::create(
            &self.db,
            CreateUser {
                email: email.to_lowercase(),
                password_hash: Some(hash_password(TEST_PASSWORD)?),
                name: Some("Test User".to_string()),
                provider: "credentials".to_string(),
            },
        )
        .await?;

        Ok(user)
    }

    /// Creates an account with a random address
    pub async fn random_user(&self) -> anyhow::Result<User> {
        self.create_user(&format!("test-{}@example.com", Uuid::new_v4())).await
    }

    /// Creates a premium account with a random address
    pub async fn premium_user(&self) -> anyhow::Result<User> {
        let user = self.random_user().await?;
        User::update_subscription(
            &self.db,
            user.id,
            SubscriptionUpdate {
                tier: "premium".to_string(),
                status: "active".to_string(),
                expires_at: None,
                stripe_customer_id: Some(format!("cus_{}", user.id)),
            },
        )
        .await?;

        Ok(User::find_by_id(&self.db, user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("premium user vanished"))?)
    }

    /// Bearer token for a user, signed the same way `/auth/login` signs it
    pub fn token_for(&self, user: &User) -> String {
        create_token(&Claims::new(user.id, &user.email), JWT_SECRET).expect("sign test token")
    }

    /// Sends a request, optionally with a JSON body and a bearer token
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    /// Sends a prepared request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), token).await
    }

    pub async fn delete(&self, uri: &str, body: Option<Value>, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, body, token).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), token).await
    }

    pub async fn patch(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PATCH, uri, Some(body), token).await
    }
}
