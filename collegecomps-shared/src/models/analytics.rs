/// Per-user analytics event log
///
/// Events are free-form: an action name plus optional JSON metadata. The
/// read side summarises a single user's own activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;

/// How many recent events the summary includes
pub const RECENT_EVENT_LIMIT: i64 = 20;

/// Days covered by the activity timeline
pub const TIMELINE_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub metadata: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

/// Lifetime totals for a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityTotals {
    pub total_events: i64,
    pub unique_event_types: i64,
    pub active_days: i64,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventBreakdown {
    pub event_type: String,
    pub count: i64,
    pub last_occurrence: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimelineDay {
    pub date: String,
    pub event_count: i64,
    pub event_types: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecentEvent {
    pub event_type: String,
    pub event_data: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub async fn track(
        pool: &SqlitePool,
        user_id: i64,
        action: &str,
        metadata: Option<Value>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AnalyticsEvent>(
            r#"
            INSERT INTO user_analytics (user_id, action, metadata)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(metadata.map(Json))
        .fetch_one(pool)
        .await
    }

    pub async fn totals(pool: &SqlitePool, user_id: i64) -> Result<ActivityTotals, sqlx::Error> {
        sqlx::query_as::<_, ActivityTotals>(
            r#"
            SELECT
                COUNT(*) AS total_events,
                COUNT(DISTINCT action) AS unique_event_types,
                COUNT(DISTINCT DATE(created_at)) AS active_days,
                MIN(created_at) AS first_activity,
                MAX(created_at) AS last_activity
            FROM user_analytics
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Event counts per action, most frequent first
    pub async fn breakdown(pool: &SqlitePool, user_id: i64) -> Result<Vec<EventBreakdown>, sqlx::Error> {
        sqlx::query_as::<_, EventBreakdown>(
            r#"
            SELECT action AS event_type, COUNT(*) AS count, MAX(created_at) AS last_occurrence
            FROM user_analytics
            WHERE user_id = ?
            GROUP BY action
            ORDER BY count DESC, action ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Daily counts over the last [`TIMELINE_DAYS`] days, newest first
    pub async fn timeline(pool: &SqlitePool, user_id: i64) -> Result<Vec<TimelineDay>, sqlx::Error> {
        sqlx::query_as::<_, TimelineDay>(
            r#"
            SELECT DATE(created_at) AS date,
                   COUNT(*) AS event_count,
                   COUNT(DISTINCT action) AS event_types
            FROM user_analytics
            WHERE user_id = ? AND datetime(created_at) >= datetime('now', ?)
            GROUP BY DATE(created_at)
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .bind(format!("-{} days", TIMELINE_DAYS))
        .fetch_all(pool)
        .await
    }

    pub async fn recent(pool: &SqlitePool, user_id: i64) -> Result<Vec<RecentEvent>, sqlx::Error> {
        sqlx::query_as::<_, RecentEvent>(
            r#"
            SELECT action AS event_type, metadata AS event_data, created_at
            FROM user_analytics
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(RECENT_EVENT_LIMIT)
        .fetch_all(pool)
        .await
    }
}
