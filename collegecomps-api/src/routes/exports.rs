/// Share links and file exports for saved comparisons
///
/// # Endpoints
///
/// - `POST /api/exports/share` - Create (or return) a share link (premium)
/// - `GET /api/exports/share/:token` - Read a shared comparison (public)
/// - `POST /api/exports/comparison` - Download as CSV or JSON (premium)
///
/// A comparison has at most one share link per owner. Asking again returns
/// the same token; an expired link is renewed in place.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, require_premium},
};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{Duration, Utc};
use collegecomps_shared::{
    auth::{
        middleware::AuthContext,
        tokens::{generate_share_token, SHARE_TOKEN_TTL_DAYS},
    },
    models::{saved_comparison::SavedComparison, shared_comparison::SharedComparison},
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub comparison_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub comparison_id: Option<i64>,
    /// `csv` or `json`
    pub format: Option<String>,
}

/// Public view of a comparison, without owner details
fn shared_view(comparison: &SavedComparison) -> Value {
    json!({
        "id": comparison.id,
        "name": comparison.name,
        "colleges": comparison.colleges,
        "program_data": comparison.program_data,
        "notes": comparison.notes,
        "tags": comparison.tags,
        "created_at": comparison.created_at,
        "updated_at": comparison.updated_at,
    })
}

async fn load_owned(state: &AppState, id: i64, user_id: i64) -> ApiResult<SavedComparison> {
    SavedComparison::find_for_user(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comparison not found".to_string()))
}

/// Create a share link
///
/// # Response
///
/// ```json
/// { "shareToken": "9f86d0...", "expiresAt": "2024-02-01T00:00:00Z", "message": "Share link created successfully" }
/// ```
pub async fn create_share(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<Json<Value>> {
    require_premium(&auth, "Sharing")?;

    let comparison_id = req
        .comparison_id
        .ok_or_else(|| ApiError::BadRequest("Comparison ID is required".to_string()))?;

    load_owned(&state, comparison_id, auth.user_id).await?;

    if let Some(existing) =
        SharedComparison::find_for_comparison(&state.db, comparison_id, auth.user_id).await?
    {
        let mut expires_at = existing.expires_at;
        if existing.is_expired() {
            let renewed = Utc::now() + Duration::days(SHARE_TOKEN_TTL_DAYS);
            SharedComparison::renew(&state.db, existing.id, renewed).await?;
            expires_at = Some(renewed);
            tracing::debug!(share_id = existing.id, "Renewed expired share link");
        }

        return Ok(Json(json!({
            "shareToken": existing.share_token,
            "expiresAt": expires_at,
            "message": "Share link already exists",
        })));
    }

    let (token, expires_at) = generate_share_token();
    let share =
        SharedComparison::create(&state.db, comparison_id, auth.user_id, &token, expires_at).await?;

    tracing::info!(user_id = auth.user_id, comparison_id, "Share link created");

    Ok(Json(json!({
        "shareToken": share.share_token,
        "expiresAt": share.expires_at,
        "message": "Share link created successfully",
    })))
}

/// Read a shared comparison
///
/// # Errors
///
/// - `404 Not Found`: Unknown token, or the comparison was deleted
/// - `410 Gone`: Link expired
pub async fn view_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<Value>> {
    let not_found = || ApiError::NotFound("Shared comparison not found".to_string());

    let share = SharedComparison::find_by_token(&state.db, &token)
        .await?
        .ok_or_else(not_found)?;

    if share.is_expired() {
        return Err(ApiError::Gone("Share link has expired".to_string()));
    }

    let comparison = SavedComparison::find_by_id(&state.db, share.comparison_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({
        "comparison": shared_view(&comparison),
        "expiresAt": share.expires_at,
    })))
}

/// Download a comparison
///
/// `pdf` and `excel` rendering is not offered by the API.
pub async fn export_comparison(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ExportRequest>,
) -> ApiResult<Response> {
    require_premium(&auth, "Exports")?;

    let (Some(comparison_id), Some(format)) = (req.comparison_id, non_blank(&req.format)) else {
        return Err(ApiError::BadRequest("Missing required parameters".to_string()));
    };

    let comparison = load_owned(&state, comparison_id, auth.user_id).await?;

    match format.to_ascii_lowercase().as_str() {
        "csv" => {
            let disposition = format!("attachment; filename=\"comparison-{}.csv\"", comparison_id);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                comparison.to_csv(),
            )
                .into_response())
        }
        "json" => Ok(Json(shared_view(&comparison)).into_response()),
        "pdf" | "excel" => Err(ApiError::BadRequest("Unsupported export format".to_string())),
        _ => Err(ApiError::BadRequest("Invalid format".to_string())),
    }
}
