/// Saved comparisons
///
/// # Endpoints
///
/// - `GET /api/saved-comparisons` - List own comparisons
/// - `POST /api/saved-comparisons` - Save a comparison (free tier: one)
/// - `DELETE /api/saved-comparisons?id=` - Delete an own comparison
/// - `POST /api/saved-comparisons/move` - Move into or out of a folder (premium)
/// - `POST /api/saved-comparisons/tags` - Add a tag (premium)
/// - `DELETE /api/saved-comparisons/tags` - Remove a tag (premium)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, require_premium, required},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    models::{
        comparison_folder::ComparisonFolder,
        saved_comparison::{CreateSavedComparison, SavedComparison, FREE_SAVED_COMPARISON_LIMIT},
    },
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComparisonRequest {
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: Option<String>,
    pub colleges: Option<Value>,
    pub program_data: Option<Value>,
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub comparison_id: Option<i64>,
    /// `None` moves the comparison out of any folder
    pub folder_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub comparison_id: Option<i64>,
    pub tag: Option<String>,
}

pub async fn list_comparisons(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let comparisons = SavedComparison::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(json!({ "comparisons": comparisons })))
}

/// Save a comparison
///
/// # Errors
///
/// - `400 Bad Request`: Missing name or colleges
/// - `403 Forbidden`: Free account already holds its one saved comparison
pub async fn create_comparison(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateComparisonRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    req.validate()?;

    let name = required(&req.name, "Name and colleges are required")?.to_string();
    let colleges = req
        .colleges
        .filter(|c| !c.is_null())
        .ok_or_else(|| ApiError::BadRequest("Name and colleges are required".to_string()))?;

    if !auth.is_premium() {
        let count = SavedComparison::count_by_user(&state.db, auth.user_id).await?;
        if count >= FREE_SAVED_COMPARISON_LIMIT {
            return Err(ApiError::Forbidden(
                "Free users can only save 1 comparison. Upgrade to Premium for unlimited comparisons."
                    .to_string(),
            ));
        }
    }

    let comparison = SavedComparison::create(
        &state.db,
        auth.user_id,
        CreateSavedComparison {
            name,
            colleges,
            program_data: req.program_data.filter(|p| !p.is_null()),
            notes: non_blank(&req.notes).map(str::to_string),
        },
    )
    .await?;

    tracing::debug!(user_id = auth.user_id, comparison_id = comparison.id, "Comparison saved");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": comparison.id })),
    ))
}

pub async fn delete_comparison(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<Value>> {
    let id = query
        .id
        .ok_or_else(|| ApiError::BadRequest("Comparison ID required".to_string()))?;

    if !SavedComparison::delete_for_user(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Comparison not found".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}

/// Move a comparison into a folder, or out of one with `folderId: null`
pub async fn move_comparison(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Value>> {
    require_premium(&auth, "Folders")?;

    let comparison_id = req
        .comparison_id
        .ok_or_else(|| ApiError::BadRequest("Comparison ID is required".to_string()))?;

    if let Some(folder_id) = req.folder_id {
        ComparisonFolder::find_for_user(&state.db, folder_id, auth.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Folder not found".to_string()))?;
    }

    if !SavedComparison::move_to_folder(&state.db, comparison_id, auth.user_id, req.folder_id).await? {
        return Err(ApiError::NotFound("Comparison not found".to_string()));
    }

    Ok(Json(json!({ "message": "Comparison moved successfully" })))
}

async fn load_for_tagging(
    state: &AppState,
    auth: &AuthContext,
    req: &TagRequest,
) -> ApiResult<(SavedComparison, String)> {
    require_premium(auth, "Tags")?;

    let (Some(id), Some(tag)) = (req.comparison_id, non_blank(&req.tag)) else {
        return Err(ApiError::BadRequest(
            "Comparison ID and tag are required".to_string(),
        ));
    };

    let comparison = SavedComparison::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comparison not found".to_string()))?;

    Ok((comparison, tag.to_string()))
}

/// Add a tag; adding an existing tag is a no-op
pub async fn add_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TagRequest>,
) -> ApiResult<Json<Value>> {
    let (comparison, tag) = load_for_tagging(&state, &auth, &req).await?;

    let tags = comparison.tags_with(&tag);
    SavedComparison::set_tags(&state.db, comparison.id, auth.user_id, &tags).await?;

    Ok(Json(json!({ "message": "Tag added successfully", "tags": tags })))
}

pub async fn remove_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TagRequest>,
) -> ApiResult<Json<Value>> {
    let (comparison, tag) = load_for_tagging(&state, &auth, &req).await?;

    let tags = comparison.tags_without(&tag);
    SavedComparison::set_tags(&state.db, comparison.id, auth.user_id, &tags).await?;

    Ok(Json(json!({ "message": "Tag removed successfully", "tags": tags })))
}
