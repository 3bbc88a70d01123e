/// Saved college comparisons
///
/// `colleges` and `program_data` are opaque JSON documents produced by the
/// comparison UI. `tags` is a JSON array of strings. Every query is scoped to
/// the owning user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;

/// Free-tier accounts may keep this many saved comparisons
pub const FREE_SAVED_COMPARISON_LIMIT: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedComparison {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub colleges: Json<Value>,
    pub program_data: Option<Json<Value>>,
    pub notes: Option<String>,
    pub folder_id: Option<i64>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSavedComparison {
    pub name: String,
    pub colleges: Value,
    pub program_data: Option<Value>,
    pub notes: Option<String>,
}

impl SavedComparison {
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        data: CreateSavedComparison,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SavedComparison>(
            r#"
            INSERT INTO saved_comparisons (user_id, name, colleges, program_data, notes)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.name)
        .bind(Json(data.colleges))
        .bind(data.program_data.map(Json))
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    /// Owner-scoped lookup
    pub async fn find_for_user(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedComparison>(
            "SELECT * FROM saved_comparisons WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Unscoped lookup, for resolving share links
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedComparison>("SELECT * FROM saved_comparisons WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Caller's comparisons, most recently updated first
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedComparison>(
            "SELECT * FROM saved_comparisons WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_user(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM saved_comparisons WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Deletes an owned comparison, returning whether a row was removed
    pub async fn delete_for_user(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM saved_comparisons WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves an owned comparison into a folder, or out of any folder with `None`
    pub async fn move_to_folder(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE saved_comparisons
            SET folder_id = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(folder_id)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the tag list
    pub async fn set_tags(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        tags: &[String],
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE saved_comparisons
            SET tags = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(Json(tags))
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tags with `tag` appended unless already present
    pub fn tags_with(&self, tag: &str) -> Vec<String> {
        let mut tags = self.tags.0.clone();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        tags
    }

    /// Tags with every occurrence of `tag` removed
    pub fn tags_without(&self, tag: &str) -> Vec<String> {
        self.tags.0.iter().filter(|t| *t != tag).cloned().collect()
    }

    /// Renders the comparison as CSV, one row per college
    ///
    /// `colleges` is either an array of college objects or an object with a
    /// `colleges` array. Missing values are written as `N/A`.
    pub fn to_csv(&self) -> String {
        const COLUMNS: [(&str, &str); 6] = [
            ("College Name", "name"),
            ("Total Cost", "totalCost"),
            ("Financial Aid", "financialAid"),
            ("Net Cost", "netCost"),
            ("Expected Salary", "expectedSalary"),
            ("ROI", "roi"),
        ];

        let header: Vec<&str> = COLUMNS.iter().map(|(title, _)| *title).collect();
        let mut csv = header.join(",");
        csv.push('\n');

        let colleges = match &self.colleges.0 {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => map
                .get("colleges")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => &[],
        };

        for college in colleges {
            let row: Vec<String> = COLUMNS
                .iter()
                .map(|(_, key)| csv_cell(college.get(*key)))
                .collect();
            csv.push_str(&row.join(","));
            csv.push('\n');
        }

        csv
    }
}

fn csv_cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) if s.is_empty() => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    format!("\"{}\"", text.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comparison(colleges: Value, tags: Vec<&str>) -> SavedComparison {
        SavedComparison {
            id: 1,
            user_id: 1,
            name: "Shortlist".to_string(),
            colleges: Json(colleges),
            program_data: None,
            notes: None,
            folder_id: None,
            tags: Json(tags.into_iter().map(String::from).collect()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tags_with_is_idempotent() {
        let c = comparison(json!([]), vec!["reach"]);
        assert_eq!(c.tags_with("reach"), vec!["reach"]);
        assert_eq!(c.tags_with("safety"), vec!["reach", "safety"]);
    }

    #[test]
    fn test_tags_without() {
        let c = comparison(json!([]), vec!["reach", "safety", "reach"]);
        assert_eq!(c.tags_without("reach"), vec!["safety"]);
        assert_eq!(c.tags_without("missing").len(), 3);
    }

    #[test]
    fn test_to_csv() {
        let c = comparison(
            json!([
                {"name": "North \"State\"", "totalCost": 120000, "roi": "12%"},
                {"name": "South College", "netCost": 80000}
            ]),
            vec![],
        );

        let csv = c.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "College Name,Total Cost,Financial Aid,Net Cost,Expected Salary,ROI"
        );
        assert_eq!(
            lines[1],
            "\"North \"\"State\"\"\",\"120000\",\"N/A\",\"N/A\",\"N/A\",\"12%\""
        );
        assert!(lines[2].starts_with("\"South College\",\"N/A\",\"N/A\",\"80000\""));
    }

    #[test]
    fn test_to_csv_nested_colleges() {
        let c = comparison(json!({"colleges": [{"name": "Only"}]}), vec![]);
        assert_eq!(c.to_csv().lines().count(), 2);

        let empty = comparison(json!("unexpected"), vec![]);
        assert_eq!(empty.to_csv().lines().count(), 1);
    }
}
