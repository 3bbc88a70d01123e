/// Comparison folders (premium)
///
/// # Endpoints
///
/// - `GET /api/comparison-folders` - List folders with comparison counts
/// - `POST /api/comparison-folders` - Create a folder
/// - `DELETE /api/comparison-folders?id=` - Delete a folder, keeping its comparisons

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, require_premium, required},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use collegecomps_shared::{auth::middleware::AuthContext, models::comparison_folder::ComparisonFolder};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: Option<String>,
    /// Hex colour, `#3B82F6` when omitted
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub id: Option<i64>,
}

/// `#RRGGBB`, the form the colour picker sends
fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub async fn list_folders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    require_premium(&auth, "Folders")?;

    let folders = ComparisonFolder::list_with_counts(&state.db, auth.user_id).await?;
    Ok(Json(json!({ "folders": folders })))
}

pub async fn create_folder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateFolderRequest>,
) -> ApiResult<Json<Value>> {
    require_premium(&auth, "Folders")?;

    let name = required(&req.name, "Folder name is required")?;

    let color = non_blank(&req.color);
    if let Some(color) = color {
        if !is_hex_color(color) {
            return Err(ApiError::BadRequest("Invalid folder color".to_string()));
        }
    }

    let folder = ComparisonFolder::create(&state.db, auth.user_id, name, color).await?;

    Ok(Json(json!({
        "id": folder.id,
        "color": folder.color,
        "message": "Folder created successfully",
    })))
}

/// Delete a folder; its comparisons move back to the top level
pub async fn delete_folder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<FolderQuery>,
) -> ApiResult<Json<Value>> {
    require_premium(&auth, "Folders")?;

    let id = query
        .id
        .ok_or_else(|| ApiError::BadRequest("Folder ID is required".to_string()))?;

    if !ComparisonFolder::delete_for_user(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Folder not found".to_string()));
    }

    Ok(Json(json!({ "message": "Folder deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#3B82F6"));
        assert!(is_hex_color("#a1b2c3"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("3B82F6"));
        assert!(!is_hex_color("#3B82F"));
        assert!(!is_hex_color("#GGGGGG"));
    }
}
