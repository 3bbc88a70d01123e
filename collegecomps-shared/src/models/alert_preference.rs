/// Premium alert settings
///
/// `preferences` is the alert list the alerts page sends back, an array of
/// `{id, type, enabled, ...}` objects. Only entries with `enabled: true`
/// count as configured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;

/// Delivery frequencies the alerts page offers
pub const ALERT_FREQUENCIES: [&str; 3] = ["instant", "daily", "weekly"];

pub const DEFAULT_ALERT_FREQUENCY: &str = "instant";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertPreferences {
    pub preferences: Json<Value>,
    pub frequency: String,
    pub updated_at: DateTime<Utc>,
}

/// Number of enabled alerts in a stored preference list
///
/// Anything other than an array counts as nothing configured.
pub fn enabled_count(preferences: &Value) -> usize {
    preferences
        .as_array()
        .map(|alerts| {
            alerts
                .iter()
                .filter(|alert| alert.get("enabled").and_then(Value::as_bool) == Some(true))
                .count()
        })
        .unwrap_or(0)
}

impl AlertPreferences {
    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AlertPreferences>(
            "SELECT preferences, frequency, updated_at FROM alert_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &SqlitePool,
        user_id: i64,
        preferences: Value,
        frequency: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AlertPreferences>(
            r#"
            INSERT INTO alert_preferences (user_id, preferences, frequency)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                preferences = excluded.preferences,
                frequency = excluded.frequency,
                updated_at = CURRENT_TIMESTAMP
            RETURNING preferences, frequency, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(preferences))
        .bind(frequency)
        .fetch_one(pool)
        .await
    }

    /// Enabled alerts for a user, `0` when nothing is stored
    ///
    /// Reads the raw column so a malformed document counts as zero instead
    /// of failing the caller.
    pub async fn configured_count(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT preferences FROM alert_preferences WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        let count = raw
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .map(|prefs| enabled_count(&prefs))
            .unwrap_or(0);

        Ok(count as i64)
    }
}
