/// Email preference links
///
/// # Endpoints
///
/// - `GET /api/unsubscribe?user=&token=` - One-click unsubscribe from every email
/// - `POST /api/unsubscribe` - Set individual preferences
///
/// Both are reachable without a session. The `token` is an HMAC of the user
/// id, so a link cannot be rewritten to another account.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::non_blank,
};
use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use collegecomps_shared::{
    auth::tokens::verify_unsubscribe_token,
    models::user::{EmailPreferences, User},
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub user: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub user_id: Option<i64>,
    pub token: Option<String>,
    #[serde(default)]
    pub preferences: EmailPreferences,
}

/// User id from a link, when its token checks out
fn verified_user(secret: &str, user: Option<&str>, token: Option<&str>) -> Option<i64> {
    let user_id = user?.parse::<i64>().ok()?;
    verify_unsubscribe_token(secret, user_id, token?).then_some(user_id)
}

/// One-click unsubscribe
///
/// Always answers with a `303` to the web app's unsubscribe page, carrying
/// `success=true`, `error=invalid` or `error=server`.
pub async fn unsubscribe_link(
    State(state): State<AppState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Redirect {
    let page = format!("{}/unsubscribe", state.config.api.base_url.trim_end_matches('/'));

    let Some(user_id) = verified_user(
        &state.emails.unsubscribe_secret,
        non_blank(&query.user),
        non_blank(&query.token),
    ) else {
        tracing::debug!(user = ?query.user, "Rejected unsubscribe link");
        return Redirect::to(&format!("{}?error=invalid", page));
    };

    match User::update_email_preferences(&state.db, user_id, EmailPreferences::all(false)).await {
        Ok(true) => {
            tracing::info!(user_id, "User unsubscribed from all emails");
            Redirect::to(&format!("{}?success=true", page))
        }
        Ok(false) => Redirect::to(&format!("{}?error=invalid", page)),
        Err(e) => {
            tracing::error!(user_id, error = %e, "Failed to unsubscribe user");
            Redirect::to(&format!("{}?error=server", page))
        }
    }
}

/// Set individual preferences; categories left out stay enabled
///
/// # Errors
///
/// - `400 Bad Request`: Missing `userId`
/// - `403 Forbidden`: Token does not match the user
/// - `404 Not Found`: Unknown user
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(req): Json<PreferencesRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::BadRequest("User ID is required".to_string()))?;

    let token = non_blank(&req.token).unwrap_or_default();
    if !verify_unsubscribe_token(&state.emails.unsubscribe_secret, user_id, token) {
        return Err(ApiError::Forbidden("Invalid unsubscribe token".to_string()));
    }

    if !User::update_email_preferences(&state.db, user_id, req.preferences).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id, preferences = ?req.preferences, "Email preferences updated");

    Ok(Json(json!({ "message": "Preferences updated successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use collegecomps_shared::auth::tokens::sign_unsubscribe_token;

    #[test]
    fn test_verified_user() {
        let secret = "unsubscribe-secret";
        let token = sign_unsubscribe_token(secret, 42);

        assert_eq!(verified_user(secret, Some("42"), Some(&token)), Some(42));
        assert_eq!(verified_user(secret, Some("43"), Some(&token)), None);
        assert_eq!(verified_user(secret, Some("abc"), Some(&token)), None);
        assert_eq!(verified_user(secret, Some("42"), None), None);
        assert_eq!(verified_user("other-secret", Some("42"), Some(&token)), None);
    }
}
