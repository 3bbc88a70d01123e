/// Crowd-sourced salary submissions
///
/// Each submission is scored for completeness when it is created. High
/// scores are published straight away, the rest wait for moderation.
/// Per-user submission counters and a reputation score live in
/// `user_submission_stats`.
///
/// # Quality score
///
/// Starts at 100 and loses points for missing optional context:
///
/// | Missing field   | Penalty |
/// |-----------------|---------|
/// | company name    | 10      |
/// | job title       | 10      |
/// | industry        | 5       |
/// | location state  | 5       |
///
/// A score of [`AUTO_APPROVE_THRESHOLD`] or more is auto-approved.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub const MIN_SALARY: i64 = 10_000;
pub const MAX_SALARY: i64 = 10_000_000;
pub const MAX_TOTAL_COMPENSATION: i64 = 20_000_000;
pub const MAX_STUDENT_DEBT: i64 = 1_000_000;
pub const MIN_GRADUATION_YEAR: i64 = 1950;

/// Submissions at or above this quality score skip moderation
pub const AUTO_APPROVE_THRESHOLD: f64 = 70.0;

/// Accounts below this reputation cannot submit
pub const MIN_REPUTATION: f64 = 50.0;

/// Free-tier submissions per UTC day
pub const FREE_DAILY_LIMIT: i64 = 3;

/// Aggregates with fewer samples than this are withheld
pub const MIN_AGGREGATE_SAMPLE: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SalarySubmission {
    pub id: i64,
    pub user_id: i64,
    pub institution_name: String,
    pub degree_level: String,
    pub major: String,
    pub graduation_year: i64,
    pub current_salary: i64,
    pub years_since_graduation: i64,
    pub total_compensation: Option<i64>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub remote_status: Option<String>,
    pub student_debt_remaining: Option<i64>,
    pub student_debt_original: Option<i64>,
    pub is_public: bool,
    pub data_quality_score: f64,
    pub is_approved: bool,
    pub moderation_status: String,
    pub created_at: DateTime<Utc>,
}

/// A validated submission ready to insert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSalarySubmission {
    pub institution_name: String,
    pub degree_level: String,
    pub major: String,
    pub graduation_year: i64,
    pub current_salary: i64,
    pub years_since_graduation: i64,
    pub total_compensation: Option<i64>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub remote_status: Option<String>,
    pub student_debt_remaining: Option<i64>,
    pub student_debt_original: Option<i64>,
    pub is_public: bool,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl NewSalarySubmission {
    /// Checks the numeric bounds, returning the first violated rule
    pub fn validate(&self) -> Result<(), &'static str> {
        self.validate_at(Utc::now().year() as i64)
    }

    fn validate_at(&self, current_year: i64) -> Result<(), &'static str> {
        let salary = self.current_salary;
        if salary < MIN_SALARY {
            return Err("Base salary seems too low. Please verify or contact support if this is accurate.");
        }
        if salary > MAX_SALARY {
            return Err("Base salary seems unusually high. Please verify or contact support if this is accurate.");
        }

        if let Some(total) = self.total_compensation.filter(|t| *t > 0) {
            if total < salary {
                return Err("Total compensation cannot be less than base salary.");
            }
            if total > MAX_TOTAL_COMPENSATION {
                return Err("Total compensation seems unusually high. Please verify or contact support if this is accurate.");
            }
        }

        if self.student_debt_original.is_some() || self.student_debt_remaining.is_some() {
            let original = self.student_debt_original.unwrap_or(0);
            let remaining = self.student_debt_remaining.unwrap_or(0);

            if original < 0 || remaining < 0 {
                return Err("Student debt amounts cannot be negative");
            }
            if remaining > original {
                return Err("Remaining debt cannot be greater than original debt.");
            }
            if original > MAX_STUDENT_DEBT {
                return Err("Student debt amount seems unusually high. Please verify or contact support if this is accurate.");
            }
        }

        if self.graduation_year < MIN_GRADUATION_YEAR || self.graduation_year > current_year {
            return Err("Invalid graduation year");
        }

        Ok(())
    }

    /// Completeness score in `0..=100`
    pub fn quality_score(&self) -> f64 {
        let mut score: f64 = 100.0;
        if !present(&self.company_name) {
            score -= 10.0;
        }
        if !present(&self.job_title) {
            score -= 10.0;
        }
        if !present(&self.industry) {
            score -= 5.0;
        }
        if !present(&self.location_state) {
            score -= 5.0;
        }
        score
    }
}

/// Per-user counters and reputation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubmissionStats {
    pub user_id: i64,
    pub total_submissions: i64,
    pub verified_submissions: i64,
    pub reputation_score: f64,
    pub last_submission_date: Option<DateTime<Utc>>,
}

/// Public aggregate row, one per (major, institution, degree, years) group
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SalaryAggregate {
    pub major: String,
    pub institution_name: String,
    pub degree_level: String,
    pub years_since_graduation: i64,
    pub avg_salary: f64,
    pub avg_total_comp: Option<f64>,
    pub sample_size: i64,
    pub min_salary: i64,
    pub max_salary: i64,
}

/// Filters for [`SalarySubmission::aggregate`]
#[derive(Debug, Clone, Default)]
pub struct AggregateFilter {
    pub major: Option<String>,
    pub institution: Option<String>,
    pub degree_level: Option<String>,
    /// Inclusive range of years since graduation
    pub years: Option<(i64, i64)>,
}

impl SalarySubmission {
    /// Inserts a submission, scoring it and setting its moderation state
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        data: NewSalarySubmission,
    ) -> Result<Self, sqlx::Error> {
        let score = data.quality_score();
        let approved = score >= AUTO_APPROVE_THRESHOLD;
        let moderation_status = if approved { "approved" } else { "pending" };

        sqlx::query_as::<_, SalarySubmission>(
            r#"
            INSERT INTO salary_submissions (
                user_id, institution_name, degree_level, major, graduation_year,
                current_salary, years_since_graduation, total_compensation,
                job_title, company_name, industry, company_size,
                location_city, location_state, remote_status,
                student_debt_remaining, student_debt_original,
                is_public, data_quality_score, is_approved, moderation_status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.institution_name)
        .bind(data.degree_level)
        .bind(data.major)
        .bind(data.graduation_year)
        .bind(data.current_salary)
        .bind(data.years_since_graduation)
        .bind(data.total_compensation)
        .bind(data.job_title)
        .bind(data.company_name)
        .bind(data.industry)
        .bind(data.company_size)
        .bind(data.location_city)
        .bind(data.location_state)
        .bind(data.remote_status)
        .bind(data.student_debt_remaining)
        .bind(data.student_debt_original)
        .bind(data.is_public)
        .bind(score)
        .bind(approved)
        .bind(moderation_status)
        .fetch_one(pool)
        .await
    }

    /// Caller's submissions, newest first
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SalarySubmission>(
            "SELECT * FROM salary_submissions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Submissions made today (UTC)
    pub async fn count_today(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM salary_submissions WHERE user_id = ? AND DATE(created_at) = DATE('now')",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn count_by_user(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM salary_submissions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Approved public submissions grouped for display
    ///
    /// Groups smaller than [`MIN_AGGREGATE_SAMPLE`] are dropped so no single
    /// submission can be read back.
    pub async fn aggregate(
        pool: &SqlitePool,
        filter: &AggregateFilter,
    ) -> Result<Vec<SalaryAggregate>, sqlx::Error> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            r#"
            SELECT major, institution_name, degree_level, years_since_graduation,
                   CAST(AVG(current_salary) AS REAL) AS avg_salary,
                   CAST(AVG(total_compensation) AS REAL) AS avg_total_comp,
                   COUNT(*) AS sample_size,
                   MIN(current_salary) AS min_salary,
                   MAX(current_salary) AS max_salary
            FROM salary_submissions
            WHERE is_approved = 1 AND is_public = 1
            "#,
        );

        if let Some(major) = &filter.major {
            builder.push(" AND major = ").push_bind(major.clone());
        }
        if let Some(institution) = &filter.institution {
            builder
                .push(" AND institution_name = ")
                .push_bind(institution.clone());
        }
        if let Some(degree) = &filter.degree_level {
            builder.push(" AND degree_level = ").push_bind(degree.clone());
        }
        if let Some((min, max)) = filter.years {
            builder
                .push(" AND years_since_graduation BETWEEN ")
                .push_bind(min)
                .push(" AND ")
                .push_bind(max);
        }

        builder
            .push(" GROUP BY major, institution_name, degree_level, years_since_graduation")
            .push(" HAVING COUNT(*) >= ")
            .push_bind(MIN_AGGREGATE_SAMPLE)
            .push(" ORDER BY years_since_graduation ASC");

        builder
            .build_query_as::<SalaryAggregate>()
            .fetch_all(pool)
            .await
    }
}

impl SubmissionStats {
    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubmissionStats>(
            r#"
            SELECT user_id, total_submissions, verified_submissions, reputation_score,
                   last_submission_date
            FROM user_submission_stats
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Counts one more submission for the user
    pub async fn record_submission(pool: &SqlitePool, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_submission_stats (user_id, total_submissions, verified_submissions, last_submission_date)
            VALUES (?, 1, 0, CURRENT_TIMESTAMP)
            ON CONFLICT(user_id) DO UPDATE SET
                total_submissions = total_submissions + 1,
                last_submission_date = CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Overrides the reputation score, used by moderation
    pub async fn set_reputation(pool: &SqlitePool, user_id: i64, score: f64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_submission_stats (user_id, reputation_score)
            VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET reputation_score = excluded.reputation_score
            "#,
        )
        .bind(user_id)
        .bind(score)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub fn is_flagged(&self) -> bool {
        self.reputation_score < MIN_REPUTATION
    }
}
