/// Public share links for saved comparisons
///
/// At most one link exists per (comparison, owner). The token is a random
/// 16-byte hex string and grants read-only access until `expires_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SharedComparison {
    pub id: i64,
    pub comparison_id: i64,
    pub user_id: i64,
    pub share_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SharedComparison {
    pub async fn create(
        pool: &SqlitePool,
        comparison_id: i64,
        user_id: i64,
        share_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SharedComparison>(
            r#"
            INSERT INTO shared_comparisons (comparison_id, user_id, share_token, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(comparison_id)
        .bind(user_id)
        .bind(share_token)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    /// The existing link for a comparison, if any
    pub async fn find_for_comparison(
        pool: &SqlitePool,
        comparison_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SharedComparison>(
            "SELECT * FROM shared_comparisons WHERE comparison_id = ? AND user_id = ?",
        )
        .bind(comparison_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SharedComparison>(
            "SELECT * FROM shared_comparisons WHERE share_token = ?",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Pushes the expiry of an existing link forward
    pub async fn renew(
        pool: &SqlitePool,
        id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE shared_comparisons SET expires_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Links the user created since the start of the current UTC month
    pub async fn count_this_month(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM shared_comparisons
            WHERE user_id = ? AND datetime(created_at) >= datetime('now', 'start of month')
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}
