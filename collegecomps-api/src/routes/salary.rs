/// Crowd-sourced salary data
///
/// # Endpoints
///
/// - `POST /api/salary-data` - Submit a salary (session required)
/// - `GET /api/salary-data` - Aggregated public salaries
///
/// Submissions are scored for completeness and auto-approved at a score of
/// 70 or more. Only approved, public submissions reach the aggregates, and
/// only in groups of at least three.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::non_blank,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    models::salary_submission::{
        AggregateFilter, NewSalarySubmission, SalaryAggregate, SalarySubmission, SubmissionStats,
        FREE_DAILY_LIMIT,
    },
};
use serde::{Deserialize, Serialize};

/// Submission body; every field optional so missing ones map to a 400
#[derive(Debug, Default, Deserialize)]
pub struct SalarySubmissionRequest {
    pub institution_name: Option<String>,
    pub degree_level: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<i64>,
    pub current_salary: Option<i64>,
    pub years_since_graduation: Option<i64>,
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
    pub is_public: Option<bool>,
}

impl SalarySubmissionRequest {
    /// Checks required fields and converts, blank optionals becoming `None`
    fn into_submission(self) -> ApiResult<NewSalarySubmission> {
        let missing = || ApiError::BadRequest("Missing required fields".to_string());

        let institution_name = non_blank(&self.institution_name).ok_or_else(missing)?.to_string();
        let degree_level = non_blank(&self.degree_level).ok_or_else(missing)?.to_string();
        let major = non_blank(&self.major).ok_or_else(missing)?.to_string();
        let graduation_year = self.graduation_year.filter(|y| *y != 0).ok_or_else(missing)?;
        let current_salary = self.current_salary.filter(|s| *s != 0).ok_or_else(missing)?;
        let years_since_graduation = self.years_since_graduation.ok_or_else(missing)?;

        let text = |value: &Option<String>| non_blank(value).map(str::to_string);

        Ok(NewSalarySubmission {
            institution_name,
            degree_level,
            major,
            graduation_year,
            current_salary,
            years_since_graduation,
            total_compensation: self.total_compensation.filter(|t| *t != 0),
            job_title: text(&self.job_title),
            company_name: text(&self.company_name),
            industry: text(&self.industry),
            company_size: text(&self.company_size),
            location_city: text(&self.location_city),
            location_state: text(&self.location_state),
            remote_status: text(&self.remote_status),
            student_debt_remaining: self.student_debt_remaining,
            student_debt_original: self.student_debt_original,
            is_public: self.is_public.unwrap_or(true),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub submission_id: i64,
    /// `approved` or `pending_review`
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateQuery {
    pub major: Option<String>,
    pub institution: Option<String>,
    pub degree_level: Option<String>,
    /// `N` or `N-M` years since graduation
    pub years_range: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub success: bool,
    pub data: Vec<SalaryAggregate>,
}

/// Parses `5` as `(5, 5)` and `5-10` as `(5, 10)`
fn parse_years_range(value: &str) -> Option<(i64, i64)> {
    let value = value.trim();
    match value.split_once('-') {
        Some((min, max)) => {
            let min = min.trim().parse().ok()?;
            let max = max.trim().parse().ok()?;
            (min <= max).then_some((min, max))
        }
        None => value.parse().ok().map(|n| (n, n)),
    }
}

/// Submit a salary
///
/// # Errors
///
/// - `400 Bad Request`: Missing field or a value outside the plausible range
/// - `403 Forbidden`: Account flagged, or free account at its daily limit
pub async fn submit_salary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SalarySubmissionRequest>,
) -> ApiResult<(StatusCode, Json<SubmissionResponse>)> {
    let submission = req.into_submission()?;
    submission
        .validate()
        .map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    if let Some(stats) = SubmissionStats::find_by_user(&state.db, auth.user_id).await? {
        if stats.is_flagged() {
            tracing::warn!(
                user_id = auth.user_id,
                score = stats.reputation_score,
                "Flagged account tried to submit salary"
            );
            return Err(ApiError::Forbidden(
                "Account flagged for suspicious activity. Please contact support.".to_string(),
            ));
        }
    }

    if !auth.is_premium() {
        let today = SalarySubmission::count_today(&state.db, auth.user_id).await?;
        if today >= FREE_DAILY_LIMIT {
            return Err(ApiError::Forbidden(format!(
                "Free users limited to {} submissions per day. Upgrade to Premium for unlimited.",
                FREE_DAILY_LIMIT
            )));
        }
    }

    let created = SalarySubmission::create(&state.db, auth.user_id, submission).await?;
    SubmissionStats::record_submission(&state.db, auth.user_id).await?;

    tracing::info!(
        user_id = auth.user_id,
        submission_id = created.id,
        quality = created.data_quality_score,
        approved = created.is_approved,
        "Salary submitted"
    );

    let (status, message) = if created.is_approved {
        (
            "approved",
            "Thank you! Your submission has been approved and will help others.",
        )
    } else {
        (
            "pending_review",
            "Thank you! Your submission is pending review and will be published soon.",
        )
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            success: true,
            submission_id: created.id,
            status: status.to_string(),
            message: message.to_string(),
        }),
    ))
}

/// Aggregated salaries by institution, major, degree and years out
pub async fn salary_aggregates(
    State(state): State<AppState>,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<Json<AggregateResponse>> {
    let years = match non_blank(&query.years_range) {
        Some(range) => Some(
            parse_years_range(range)
                .ok_or_else(|| ApiError::BadRequest("Invalid yearsRange".to_string()))?,
        ),
        None => None,
    };

    let filter = AggregateFilter {
        major: non_blank(&query.major).map(str::to_string),
        institution: non_blank(&query.institution).map(str::to_string),
        degree_level: non_blank(&query.degree_level).map(str::to_string),
        years,
    };

    let data = SalarySubmission::aggregate(&state.db, &filter).await?;

    Ok(Json(AggregateResponse {
        success: true,
        data,
    }))
}
