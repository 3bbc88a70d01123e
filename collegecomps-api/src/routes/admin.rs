/// Staff view of the support queue
///
/// # Endpoints
///
/// - `GET /api/admin/support/tickets?status=&priority=&category=` - Queue with counts
/// - `GET /api/admin/support/tickets/:id` - Any ticket with its thread
/// - `POST /api/admin/support/tickets/:id` - Staff reply, emailed to the owner
/// - `PATCH /api/admin/support/tickets/:id` - Set status and/or priority
///
/// Staff are accounts with role `admin` or an email in `ADMIN_EMAIL_DOMAIN`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, required, support::{ticket_recipient, TicketDetail}},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use collegecomps_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::support_ticket::{
        is_valid_priority, is_valid_status, MessageAuthor, SupportTicket, TicketFilter, TicketStats,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub tickets: Vec<SupportTicket>,
    pub stats: TicketStats,
}

#[derive(Debug, Deserialize)]
pub struct StaffReplyRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TicketUpdateRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
}

fn require_staff(state: &AppState, auth: &AuthContext) -> ApiResult<()> {
    require_admin(auth, state.admin_domain()).map_err(|e| {
        tracing::warn!(user_id = auth.user_id, "Non-staff account tried an admin endpoint");
        ApiError::from(e)
    })
}

async fn load_ticket(state: &AppState, id: i64) -> ApiResult<SupportTicket> {
    SupportTicket::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<QueueResponse>> {
    require_staff(&state, &auth)?;

    let filter = TicketFilter {
        status: non_blank(&query.status).map(str::to_string),
        priority: non_blank(&query.priority).map(str::to_string),
        category: non_blank(&query.category).map(str::to_string),
    };

    let tickets = SupportTicket::list_filtered(&state.db, &filter).await?;
    let stats = SupportTicket::stats(&state.db).await?;

    Ok(Json(QueueResponse { tickets, stats }))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TicketDetail>> {
    require_staff(&state, &auth)?;

    let ticket = load_ticket(&state, id).await?;
    let messages = SupportTicket::messages(&state.db, ticket.id).await?;

    Ok(Json(TicketDetail { ticket, messages }))
}

/// Staff reply; the owner is notified by email
pub async fn reply_to_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<StaffReplyRequest>,
) -> ApiResult<Json<Value>> {
    require_staff(&state, &auth)?;

    let message = required(&req.message, "Message is required")?;
    let ticket = load_ticket(&state, id).await?;

    let message_id =
        SupportTicket::add_message(&state.db, ticket.id, MessageAuthor::Staff(auth.user_id), message)
            .await?;

    tracing::info!(ticket_id = ticket.id, staff_id = auth.user_id, "Staff replied to ticket");

    state
        .send_email(state.emails.ticket_reply(
            ticket_recipient(&ticket),
            ticket.id,
            &ticket.subject,
            message,
            true,
        ))
        .await;

    Ok(Json(json!({ "success": true, "messageId": message_id })))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<TicketUpdateRequest>,
) -> ApiResult<Json<Value>> {
    require_staff(&state, &auth)?;

    let status = non_blank(&req.status);
    let priority = non_blank(&req.priority);

    if status.is_none() && priority.is_none() {
        return Err(ApiError::BadRequest("No updates provided".to_string()));
    }
    if status.is_some_and(|s| !is_valid_status(s)) {
        return Err(ApiError::BadRequest("Invalid status".to_string()));
    }
    if priority.is_some_and(|p| !is_valid_priority(p)) {
        return Err(ApiError::BadRequest("Invalid priority".to_string()));
    }

    if !SupportTicket::update_fields(&state.db, id, status, priority).await? {
        return Err(ApiError::NotFound("Ticket not found".to_string()));
    }

    tracing::info!(ticket_id = id, ?status, ?priority, "Ticket updated by staff");

    Ok(Json(json!({ "success": true })))
}
