/// Bookmarked colleges
///
/// A user can bookmark each college (by IPEDS `unitid`) once; the unique
/// constraint on `(user_id, unitid)` rejects duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bookmark {
    pub id: i64,
    pub unitid: i64,
    pub institution_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub control: Option<String>,
    pub notes: Option<String>,
    pub tags: Json<Vec<String>>,
    pub bookmarked_at: DateTime<Utc>,
}

/// College details copied into the bookmark at creation time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBookmark {
    pub unitid: i64,
    pub institution_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub control: Option<String>,
}

impl Bookmark {
    /// Adds a bookmark
    ///
    /// # Errors
    ///
    /// A unique violation when the college is already bookmarked.
    pub async fn create(pool: &SqlitePool, user_id: i64, data: NewBookmark) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarked_colleges (user_id, unitid, institution_name, city, state, control)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, unitid, institution_name, city, state, control, notes, tags, bookmarked_at
            "#,
        )
        .bind(user_id)
        .bind(data.unitid)
        .bind(data.institution_name)
        .bind(data.city)
        .bind(data.state)
        .bind(data.control)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, user_id: i64, unitid: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarked_colleges WHERE user_id = ? AND unitid = ?")
            .bind(user_id)
            .bind(unitid)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Caller's bookmarks, newest first
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT id, unitid, institution_name, city, state, control, notes, tags, bookmarked_at
            FROM bookmarked_colleges
            WHERE user_id = ?
            ORDER BY bookmarked_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn exists(pool: &SqlitePool, user_id: i64, unitid: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookmarked_colleges WHERE user_id = ? AND unitid = ?)",
        )
        .bind(user_id)
        .bind(unitid)
        .fetch_one(pool)
        .await
    }
}
