/// Answers collected by the post-signup onboarding flow
///
/// One row per user in `user_preferences`. Saving replaces the onboarding
/// answers and marks onboarding as completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OnboardingPreferences {
    pub intended_major: Option<String>,
    pub degree_level: Option<String>,
    pub target_schools: Json<Value>,
    pub expected_graduation_year: Option<i64>,
    pub preferred_state: Option<String>,
    pub max_tuition: Option<i64>,
    pub preferred_programs: Json<Value>,
    pub onboarding_completed: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveOnboarding {
    pub intended_major: Option<String>,
    pub degree_level: Option<String>,
    pub target_schools: Option<Value>,
    pub expected_graduation_year: Option<i64>,
}

impl OnboardingPreferences {
    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, OnboardingPreferences>(
            r#"
            SELECT intended_major, degree_level, target_schools, expected_graduation_year,
                   preferred_state, max_tuition, preferred_programs, onboarding_completed,
                   updated_at
            FROM user_preferences
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Stores the onboarding answers and sets `onboarding_completed`
    ///
    /// `preferred_state`, `max_tuition` and `preferred_programs` are not part
    /// of the onboarding form and keep their stored values.
    pub async fn save(
        pool: &SqlitePool,
        user_id: i64,
        data: SaveOnboarding,
    ) -> Result<Self, sqlx::Error> {
        let target_schools = match data.target_schools {
            Some(Value::Null) | None => Value::Array(Vec::new()),
            Some(schools) => schools,
        };

        sqlx::query_as::<_, OnboardingPreferences>(
            r#"
            INSERT INTO user_preferences
                (user_id, intended_major, degree_level, target_schools,
                 expected_graduation_year, onboarding_completed)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT(user_id) DO UPDATE SET
                intended_major = excluded.intended_major,
                degree_level = excluded.degree_level,
                target_schools = excluded.target_schools,
                expected_graduation_year = excluded.expected_graduation_year,
                onboarding_completed = 1,
                updated_at = CURRENT_TIMESTAMP
            RETURNING intended_major, degree_level, target_schools, expected_graduation_year,
                      preferred_state, max_tuition, preferred_programs, onboarding_completed,
                      updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.intended_major)
        .bind(data.degree_level)
        .bind(Json(target_schools))
        .bind(data.expected_graduation_year)
        .fetch_one(pool)
        .await
    }
}
