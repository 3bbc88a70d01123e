/// Recommendation questionnaire answers
///
/// One row per user in `user_responses`. Unlike the academic profile, saving
/// replaces every answer: a field left out of the body is cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionnaireResponses {
    pub id: i64,
    pub user_id: i64,
    pub gpa: Option<f64>,
    pub sat_score: Option<i64>,
    pub act_score: Option<i64>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub parent_income: Option<i64>,
    pub student_income: Option<i64>,
    pub preferred_states: Option<Json<Vec<String>>>,
    pub preferred_major: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveResponses {
    pub gpa: Option<f64>,
    pub sat_score: Option<i64>,
    pub act_score: Option<i64>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub parent_income: Option<i64>,
    pub student_income: Option<i64>,
    pub preferred_states: Option<Vec<String>>,
    pub preferred_major: Option<String>,
}

impl QuestionnaireResponses {
    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuestionnaireResponses>("SELECT * FROM user_responses WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Writes the answers, returning the row and whether it was newly created
    pub async fn save(
        pool: &SqlitePool,
        user_id: i64,
        data: SaveResponses,
    ) -> Result<(Self, bool), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existed: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_responses WHERE user_id = ?)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        let row = sqlx::query_as::<_, QuestionnaireResponses>(
            r#"
            INSERT INTO user_responses
                (user_id, gpa, sat_score, act_score, zip_code, latitude, longitude,
                 parent_income, student_income, preferred_states, preferred_major)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                gpa = excluded.gpa,
                sat_score = excluded.sat_score,
                act_score = excluded.act_score,
                zip_code = excluded.zip_code,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                parent_income = excluded.parent_income,
                student_income = excluded.student_income,
                preferred_states = excluded.preferred_states,
                preferred_major = excluded.preferred_major,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.gpa)
        .bind(data.sat_score)
        .bind(data.act_score)
        .bind(data.zip_code)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.parent_income)
        .bind(data.student_income)
        .bind(data.preferred_states.map(Json))
        .bind(data.preferred_major)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((row, !existed))
    }

    pub async fn delete_for_user(pool: &SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_responses WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
