/// Account endpoints for the signed-in user
///
/// # Endpoints
///
/// - `GET /api/user/me` - Account summary
/// - `GET /api/user/profile` - Academic profile
/// - `PUT /api/user/profile` - Merge academic profile fields, optionally rename
/// - `PUT /api/user/password` - Change password
/// - `GET /api/user/salary-submissions` - Own salary submissions
/// - `GET /api/user/usage-stats` - Feature usage counters
/// - `GET|POST /api/user/onboarding` - Onboarding answers and completion flag
/// - `GET|POST|PUT|DELETE /api/user/responses` - Recommendation questionnaire

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::non_blank,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use collegecomps_shared::{
    auth::{middleware::AuthContext, password},
    models::{
        alert_preference::AlertPreferences,
        comparison_folder::ComparisonFolder,
        onboarding::{OnboardingPreferences, SaveOnboarding},
        profile::{ProfileUpdate, UserProfile},
        questionnaire::{QuestionnaireResponses, SaveResponses},
        salary_submission::SalarySubmission,
        saved_comparison::SavedComparison,
        shared_comparison::SharedComparison,
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Account summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub subscription_tier: String,
    pub subscription_status: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            subscription_tier: user.subscription_tier,
            subscription_status: user.subscription_status,
            subscription_expires_at: user.subscription_expires_at,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

/// Profile update body: the academic fields plus an optional new name
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,

    #[serde(flatten)]
    pub profile: ProfileUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsageStats {
    pub saved_comparisons: i64,
    pub exports_this_month: i64,
    pub alerts_configured: i64,
    pub folders_created: i64,
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatus {
    pub onboarding_completed: bool,
    pub preferences: Option<OnboardingPreferences>,
}

/// `preferred_states` arrives either as a list or as a single state
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PreferredStates {
    Many(Vec<String>),
    One(String),
}

/// Questionnaire body
#[derive(Debug, Default, Deserialize)]
pub struct ResponsesRequest {
    pub gpa: Option<f64>,
    pub sat_score: Option<i64>,
    pub act_score: Option<i64>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub parent_income: Option<i64>,
    pub student_income: Option<i64>,
    pub preferred_states: Option<PreferredStates>,
    pub preferred_major: Option<String>,
}

impl ResponsesRequest {
    fn into_save(self) -> SaveResponses {
        let preferred_states = self.preferred_states.map(|states| match states {
            PreferredStates::Many(states) => states,
            PreferredStates::One(state) => vec![state],
        });

        SaveResponses {
            gpa: self.gpa,
            sat_score: self.sat_score,
            act_score: self.act_score,
            zip_code: non_blank(&self.zip_code).map(str::to_string),
            latitude: self.latitude,
            longitude: self.longitude,
            parent_income: self.parent_income,
            student_income: self.student_income,
            preferred_states,
            preferred_major: non_blank(&self.preferred_major).map(str::to_string),
        }
    }
}

async fn load_user(state: &AppState, user_id: i64) -> ApiResult<User> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Academic profile, `null` until first saved
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let profile = UserProfile::find_by_user(&state.db, auth.user_id).await?;
    Ok(Json(json!({ "profile": profile })))
}

/// Merge profile fields
///
/// Fields left out of the body keep their stored value. A blank `name` is
/// ignored.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let name = non_blank(&req.name).map(str::to_string);
    if let Some(name) = &name {
        User::update_name(&state.db, auth.user_id, name).await?;
    }

    let profile = if req.profile.is_empty() {
        UserProfile::find_by_user(&state.db, auth.user_id).await?
    } else {
        Some(UserProfile::upsert(&state.db, auth.user_id, req.profile).await?)
    };

    tracing::debug!(user_id = auth.user_id, renamed = name.is_some(), "Profile updated");

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "name": name,
        "profile": profile,
    })))
}

/// Change password, verifying the current one
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields or new password under 8 characters
/// - `401 Unauthorized`: Current password is incorrect
/// - `404 Not Found`: Account has been deleted
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let (current, new) = match (req.current_password.as_deref(), req.new_password.as_deref()) {
        (Some(c), Some(n)) if !c.is_empty() && !n.is_empty() => (c, n),
        _ => {
            return Err(ApiError::BadRequest(
                "Current and new passwords are required".to_string(),
            ))
        }
    };

    if password::validate_password_length(new).is_err() {
        return Err(ApiError::BadRequest(format!(
            "New password must be at least {} characters",
            password::MIN_PASSWORD_LENGTH
        )));
    }

    let user = load_user(&state, auth.user_id).await?;

    let matches = match user.password_hash.as_deref() {
        Some(hash) => password::verify_password(current, hash)?,
        None => false,
    };
    if !matches {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let hash = password::hash_password(new)?;
    User::update_password(&state.db, user.id, &hash).await?;

    tracing::info!(user_id = user.id, "Password changed");

    Ok(Json(json!({
        "success": true,
        "message": "Password updated successfully",
    })))
}

pub async fn salary_submissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let submissions = SalarySubmission::list_by_user(&state.db, auth.user_id).await?;
    let count = submissions.len();
    Ok(Json(json!({ "submissions": submissions, "count": count })))
}

/// Counters shown on the account page
///
/// Share links created this month stand in for exports.
pub async fn usage_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UsageStats>> {
    let saved_comparisons = SavedComparison::count_by_user(&state.db, auth.user_id).await?;
    let exports_this_month = SharedComparison::count_this_month(&state.db, auth.user_id).await?;
    let alerts_configured = AlertPreferences::configured_count(&state.db, auth.user_id).await?;
    let folders_created = ComparisonFolder::count_by_user(&state.db, auth.user_id).await?;

    Ok(Json(UsageStats {
        saved_comparisons,
        exports_this_month,
        alerts_configured,
        folders_created,
    }))
}

/// Onboarding answers; `preferences` is `null` before the first save
pub async fn get_onboarding(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<OnboardingStatus>> {
    let preferences = OnboardingPreferences::find_by_user(&state.db, auth.user_id).await?;

    Ok(Json(OnboardingStatus {
        onboarding_completed: preferences
            .as_ref()
            .is_some_and(|p| p.onboarding_completed),
        preferences,
    }))
}

/// Save onboarding answers and mark onboarding complete
pub async fn save_onboarding(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SaveOnboarding>,
) -> ApiResult<Json<Value>> {
    OnboardingPreferences::save(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = auth.user_id, "Onboarding completed");

    Ok(Json(json!({
        "success": true,
        "message": "Onboarding preferences saved successfully",
    })))
}

pub async fn get_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let responses = QuestionnaireResponses::find_by_user(&state.db, auth.user_id).await?;
    Ok(Json(json!({ "responses": responses })))
}

/// Save questionnaire answers
///
/// Answers the first save with 201 and later ones with 200. Every save
/// replaces the whole answer set.
pub async fn save_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ResponsesRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (responses, created) =
        QuestionnaireResponses::save(&state.db, auth.user_id, req.into_save()).await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "Responses saved successfully")
    } else {
        (StatusCode::OK, "Responses updated successfully")
    };

    Ok((status, Json(json!({ "message": message, "responses": responses }))))
}

pub async fn delete_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let removed = QuestionnaireResponses::delete_for_user(&state.db, auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, removed, "Questionnaire responses deleted");

    Ok(Json(json!({ "message": "Responses deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_preferred_state_becomes_list() {
        let req: ResponsesRequest =
            serde_json::from_value(json!({ "preferred_states": "CA", "zip_code": "  " })).unwrap();
        let save = req.into_save();

        assert_eq!(save.preferred_states, Some(vec!["CA".to_string()]));
        assert_eq!(save.zip_code, None);

        let req: ResponsesRequest =
            serde_json::from_value(json!({ "preferred_states": ["CA", "OR"] })).unwrap();
        assert_eq!(req.into_save().preferred_states.map(|s| s.len()), Some(2));
    }
}
