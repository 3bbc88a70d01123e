/// Academic profile attached to a user account
///
/// One row per user. Updates only overwrite the fields the caller supplied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub gpa: Option<f64>,
    pub sat: Option<i64>,
    pub act: Option<i64>,
    pub budget: Option<i64>,
    pub location_preference: Option<String>,
    pub program_interest: Option<String>,
    pub career_goals: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Fields to write; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub gpa: Option<f64>,
    pub sat: Option<i64>,
    pub act: Option<i64>,
    pub budget: Option<i64>,
    pub location_preference: Option<String>,
    pub program_interest: Option<String>,
    pub career_goals: Option<String>,
}

impl ProfileUpdate {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.gpa.is_none()
            && self.sat.is_none()
            && self.act.is_none()
            && self.budget.is_none()
            && self.location_preference.is_none()
            && self.program_interest.is_none()
            && self.career_goals.is_none()
    }
}

impl UserProfile {
    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT gpa, sat, act, budget, location_preference, program_interest,
                   career_goals, updated_at
            FROM user_profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Inserts the profile or merges `data` into the existing one
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: i64,
        data: ProfileUpdate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles
                (user_id, gpa, sat, act, budget, location_preference, program_interest, career_goals)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                gpa = COALESCE(excluded.gpa, user_profiles.gpa),
                sat = COALESCE(excluded.sat, user_profiles.sat),
                act = COALESCE(excluded.act, user_profiles.act),
                budget = COALESCE(excluded.budget, user_profiles.budget),
                location_preference = COALESCE(excluded.location_preference, user_profiles.location_preference),
                program_interest = COALESCE(excluded.program_interest, user_profiles.program_interest),
                career_goals = COALESCE(excluded.career_goals, user_profiles.career_goals),
                updated_at = CURRENT_TIMESTAMP
            RETURNING gpa, sat, act, budget, location_preference, program_interest,
                      career_goals, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.gpa)
        .bind(data.sat)
        .bind(data.act)
        .bind(data.budget)
        .bind(data.location_preference)
        .bind(data.program_interest)
        .bind(data.career_goals)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());

        let update = ProfileUpdate {
            sat: Some(1400),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
