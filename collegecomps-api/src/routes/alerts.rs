/// Alert preferences (premium)
///
/// # Endpoints
///
/// - `GET /api/alerts/preferences` - Stored alert list and frequency
/// - `POST /api/alerts/preferences` - Replace the alert list and frequency

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::require_premium,
};
use axum::{extract::State, Extension, Json};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    models::alert_preference::{AlertPreferences, ALERT_FREQUENCIES, DEFAULT_ALERT_FREQUENCY},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct SaveAlertsRequest {
    pub preferences: Option<Value>,
    pub frequency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub preferences: Option<Value>,
    pub frequency: String,
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AlertsResponse>> {
    require_premium(&auth, "alerts")?;

    let stored = AlertPreferences::find_by_user(&state.db, auth.user_id).await?;

    Ok(Json(match stored {
        Some(prefs) => AlertsResponse {
            preferences: Some(prefs.preferences.0),
            frequency: prefs.frequency,
        },
        None => AlertsResponse {
            preferences: None,
            frequency: DEFAULT_ALERT_FREQUENCY.to_string(),
        },
    }))
}

/// Save the alert list
///
/// # Errors
///
/// - `400 Bad Request`: Missing preferences or unknown frequency
/// - `403 Forbidden`: Free tier
pub async fn save_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SaveAlertsRequest>,
) -> ApiResult<Json<Value>> {
    require_premium(&auth, "alerts")?;

    let preferences = match req.preferences {
        Some(Value::Null) | None => {
            return Err(ApiError::BadRequest("Preferences are required".to_string()))
        }
        Some(prefs) => prefs,
    };

    let frequency = req.frequency.as_deref().unwrap_or(DEFAULT_ALERT_FREQUENCY);
    if !ALERT_FREQUENCIES.contains(&frequency) {
        return Err(ApiError::BadRequest(format!(
            "Frequency must be one of: {}",
            ALERT_FREQUENCIES.join(", ")
        )));
    }

    AlertPreferences::upsert(&state.db, auth.user_id, preferences, frequency).await?;

    tracing::debug!(user_id = auth.user_id, frequency, "Alert preferences saved");

    Ok(Json(json!({ "message": "Alert preferences saved successfully" })))
}
