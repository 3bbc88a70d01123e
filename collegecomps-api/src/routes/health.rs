/// Health check endpoint
///
/// Checks both databases and reports per-database latency and row counts:
/// - users database: `SELECT COUNT(*) FROM users`
/// - college facts database: `SELECT COUNT(*) FROM institutions`
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2024-01-01T00:00:00Z",
///   "checks": {
///     "users_database": { "status": "healthy", "response_time_ms": 1, "row_count": 42 },
///     "college_database": { "status": "not_configured" }
///   }
/// }
/// ```
///
/// `unhealthy` (users database down) is served with 503; a failing college
/// database only degrades the status.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Instant;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, `degraded` or `unhealthy`
    pub status: String,

    /// Application version
    pub version: String,

    pub timestamp: DateTime<Utc>,

    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub users_database: DatabaseCheck,
    pub college_database: DatabaseCheck,
}

/// Result of probing one database
#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseCheck {
    /// `healthy`, `unhealthy` or `not_configured`
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseCheck {
    fn not_configured() -> Self {
        Self {
            status: "not_configured".to_string(),
            response_time_ms: None,
            row_count: None,
            error: None,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

async fn check_database(pool: &SqlitePool, count_query: &str) -> DatabaseCheck {
    let started = Instant::now();
    let result: Result<i64, sqlx::Error> = sqlx::query_scalar(count_query).fetch_one(pool).await;
    let elapsed = started.elapsed().as_millis() as u64;

    match result {
        Ok(count) => DatabaseCheck {
            status: "healthy".to_string(),
            response_time_ms: Some(elapsed),
            row_count: Some(count),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, query = count_query, "Health check query failed");
            DatabaseCheck {
                status: "unhealthy".to_string(),
                response_time_ms: Some(elapsed),
                row_count: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let users_database = check_database(&state.db, "SELECT COUNT(*) FROM users").await;

    let college_database = match &state.college_db {
        Some(pool) => check_database(pool, "SELECT COUNT(*) FROM institutions").await,
        None => DatabaseCheck::not_configured(),
    };

    let (status, code) = if !users_database.is_healthy() {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    } else if college_database.status == "unhealthy" {
        ("degraded", StatusCode::OK)
    } else {
        ("healthy", StatusCode::OK)
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                users_database,
                college_database,
            },
        }),
    )
}
