/// Per-user activity tracking
///
/// # Endpoints
///
/// - `POST /api/analytics/track` - Record an event
/// - `GET /api/analytics/stats` - The caller's own activity dashboard

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::non_blank,
};
use axum::{extract::State, Extension, Json};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    models::{
        analytics::{ActivityTotals, AnalyticsEvent, EventBreakdown, RecentEvent, TimelineDay},
        salary_submission::SalarySubmission,
        saved_comparison::SavedComparison,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub event_type: Option<String>,
    pub event_data: Option<Value>,
    pub page_url: Option<String>,
}

impl TrackRequest {
    /// Event metadata, with `pageUrl` folded in when present
    fn metadata(&self) -> Option<Value> {
        let data = self.event_data.clone().filter(|d| !d.is_null());
        let Some(page_url) = non_blank(&self.page_url) else {
            return data;
        };

        match data {
            Some(Value::Object(mut map)) => {
                map.entry("pageUrl").or_insert_with(|| json!(page_url));
                Some(Value::Object(map))
            }
            Some(other) => Some(json!({ "data": other, "pageUrl": page_url })),
            None => {
                let mut map = Map::new();
                map.insert("pageUrl".to_string(), json!(page_url));
                Some(Value::Object(map))
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub stats: ActivityTotals,
    pub event_breakdown: Vec<EventBreakdown>,
    pub timeline: Vec<TimelineDay>,
    pub recent_events: Vec<RecentEvent>,
    pub saved_comparisons: i64,
    pub salary_submissions: i64,
    pub subscription_tier: String,
}

pub async fn track(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TrackRequest>,
) -> ApiResult<Json<Value>> {
    let event_type = non_blank(&req.event_type)
        .ok_or_else(|| ApiError::BadRequest("Event type is required".to_string()))?;

    AnalyticsEvent::track(&state.db, auth.user_id, event_type, req.metadata()).await?;

    Ok(Json(json!({ "success": true })))
}

/// Activity dashboard
///
/// Totals, per-action counts, a 30-day timeline and the 20 most recent
/// events, plus saved-comparison and salary-submission counts.
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<StatsResponse>> {
    let stats = AnalyticsEvent::totals(&state.db, auth.user_id).await?;
    let event_breakdown = AnalyticsEvent::breakdown(&state.db, auth.user_id).await?;
    let timeline = AnalyticsEvent::timeline(&state.db, auth.user_id).await?;
    let recent_events = AnalyticsEvent::recent(&state.db, auth.user_id).await?;
    let saved_comparisons = SavedComparison::count_by_user(&state.db, auth.user_id).await?;
    let salary_submissions = SalarySubmission::count_by_user(&state.db, auth.user_id).await?;

    Ok(Json(StatsResponse {
        stats,
        event_breakdown,
        timeline,
        recent_events,
        saved_comparisons,
        salary_submissions,
        subscription_tier: auth.tier.as_str().to_string(),
    }))
}
