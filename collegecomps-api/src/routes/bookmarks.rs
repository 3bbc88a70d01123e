/// Bookmarked colleges
///
/// # Endpoints
///
/// - `GET /api/bookmarks/colleges` - List own bookmarks, newest first
/// - `POST /api/bookmarks/colleges` - Add or remove a bookmark
/// - `GET /api/bookmarks/colleges/check?unitid=` - Whether a college is bookmarked
///
/// The check endpoint runs behind the optional session layer and answers
/// `false` for anonymous callers rather than 401, so college pages can call
/// it unconditionally.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::non_blank,
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    models::bookmark::{Bookmark, NewBookmark},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct BookmarkRequest {
    pub unitid: Option<i64>,
    /// `add` or `remove`
    pub action: Option<String>,
    pub institution_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub control: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub unitid: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub is_bookmarked: bool,
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let bookmarks = Bookmark::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(json!({ "bookmarks": bookmarks })))
}

/// Add or remove a bookmark
///
/// # Errors
///
/// - `400 Bad Request`: Missing `unitid`/`action` or unknown action
/// - `409 Conflict`: College already bookmarked
pub async fn update_bookmark(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BookmarkRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(unitid), Some(action)) = (req.unitid, non_blank(&req.action)) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    match action {
        "add" => {
            let text = |value: &Option<String>| non_blank(value).map(str::to_string);
            let data = NewBookmark {
                unitid,
                institution_name: text(&req.institution_name),
                city: text(&req.city),
                state: text(&req.state),
                control: text(&req.control),
            };

            Bookmark::create(&state.db, auth.user_id, data)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                        ApiError::Conflict("College already bookmarked".to_string())
                    }
                    other => other.into(),
                })?;

            Ok(Json(json!({
                "success": true,
                "message": "College bookmarked successfully",
            })))
        }
        "remove" => {
            Bookmark::delete(&state.db, auth.user_id, unitid).await?;

            Ok(Json(json!({
                "success": true,
                "message": "Bookmark removed successfully",
            })))
        }
        _ => Err(ApiError::BadRequest("Invalid action".to_string())),
    }
}

/// Whether the caller has bookmarked `unitid`
///
/// Only a missing `unitid` from a signed-in caller is an error; every other
/// failure reads as "not bookmarked".
pub async fn check_bookmark(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<CheckQuery>,
) -> ApiResult<Json<CheckResponse>> {
    let not_bookmarked = Json(CheckResponse { is_bookmarked: false });

    let Some(Extension(auth)) = auth else {
        return Ok(not_bookmarked);
    };

    let unitid = non_blank(&query.unitid)
        .ok_or_else(|| ApiError::BadRequest("Missing unitid".to_string()))?;

    let Ok(unitid) = unitid.parse::<i64>() else {
        return Ok(not_bookmarked);
    };

    match Bookmark::exists(&state.db, auth.user_id, unitid).await {
        Ok(is_bookmarked) => Ok(Json(CheckResponse { is_bookmarked })),
        Err(e) => {
            tracing::warn!(user_id = auth.user_id, unitid, error = %e, "Bookmark check failed");
            Ok(not_bookmarked)
        }
    }
}
