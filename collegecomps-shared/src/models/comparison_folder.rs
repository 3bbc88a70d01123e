/// Folders for organising saved comparisons
///
/// Deleting a folder moves its comparisons back to the top level; the
/// comparisons themselves are kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub const DEFAULT_FOLDER_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComparisonFolder {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Folder listing row with its comparison count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FolderSummary {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub comparison_count: i64,
}

impl ComparisonFolder {
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        name: &str,
        color: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ComparisonFolder>(
            r#"
            INSERT INTO comparison_folders (user_id, name, color)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(color.unwrap_or(DEFAULT_FOLDER_COLOR))
        .fetch_one(pool)
        .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ComparisonFolder>(
            "SELECT * FROM comparison_folders WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Caller's folders, newest first, with comparison counts
    pub async fn list_with_counts(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<FolderSummary>, sqlx::Error> {
        sqlx::query_as::<_, FolderSummary>(
            r#"
            SELECT f.id, f.name, f.color, f.created_at, COUNT(sc.id) AS comparison_count
            FROM comparison_folders f
            LEFT JOIN saved_comparisons sc ON sc.folder_id = f.id
            WHERE f.user_id = ?
            GROUP BY f.id
            ORDER BY f.created_at DESC, f.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_user(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comparison_folders WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Empties and deletes an owned folder in one transaction
    pub async fn delete_for_user(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE saved_comparisons
            SET folder_id = NULL
            WHERE folder_id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM comparison_folders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
