/// Customer support tickets
///
/// # Endpoints
///
/// - `GET /api/support/tickets` - List own tickets, active first
/// - `POST /api/support/tickets` - Open a ticket
/// - `GET /api/support/tickets/:id` - Own ticket with its thread
/// - `POST /api/support/tickets/:id` - Reply to an own ticket
/// - `PATCH /api/support/tickets/:id` - Open or close an own ticket
/// - `GET /api/support/email-webhook` - Liveness check for the mail provider
/// - `POST /api/support/email-webhook` - Inbound email reply (no session)
///
/// Ticket priority follows the owner's tier at creation time. Inbound email
/// replies are matched to a ticket by the `#<id>` in their subject and only
/// accepted from the address the ticket was opened with.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, required},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use collegecomps_shared::{
    auth::middleware::AuthContext,
    email::templates::Recipient,
    models::support_ticket::{
        normalize_sender, parse_ticket_id, CreateTicket, MessageAuthor, SupportMessage,
        SupportTicket, USER_SETTABLE_STATUSES,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Inbound email as posted by the mail provider
#[derive(Debug, Deserialize)]
pub struct InboundEmail {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    pub ticket: SupportTicket,
    pub messages: Vec<SupportMessage>,
}

/// Email recipient from the ticket's own snapshot of its owner
pub(crate) fn ticket_recipient(ticket: &SupportTicket) -> Recipient<'_> {
    Recipient {
        user_id: ticket.user_id,
        email: &ticket.user_email,
        name: ticket.user_name.as_deref(),
    }
}

fn response_window(priority: &str) -> &'static str {
    match priority {
        "urgent" | "high" => "Your ticket has been marked as HIGH PRIORITY and will be reviewed within 4 hours",
        "normal" => "Your ticket will be reviewed within 24 hours",
        _ => "Your ticket will be reviewed within 48 hours",
    }
}

async fn load_own_ticket(state: &AppState, id: i64, user_id: i64) -> ApiResult<SupportTicket> {
    SupportTicket::find_for_user(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found or access denied".to_string()))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let tickets = SupportTicket::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(json!({ "tickets": tickets })))
}

/// Open a ticket
///
/// # Response
///
/// ```json
/// { "message": "Support ticket created successfully", "ticket": { ... }, "priority": "Your ticket will be reviewed within 24 hours" }
/// ```
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let missing = "Subject, category, and description are required";
    let subject = required(&req.subject, missing)?;
    let category = required(&req.category, missing)?;
    let description = required(&req.description, missing)?;

    let priority = auth.tier.support_priority();

    let ticket = SupportTicket::create(
        &state.db,
        CreateTicket {
            user_id: auth.user_id,
            user_email: auth.email.clone(),
            user_name: auth.name.clone(),
            subscription_tier: auth.tier.as_str().to_string(),
            subject: subject.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            priority: priority.to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = auth.user_id, ticket_id = ticket.id, priority, "Support ticket opened");

    state
        .send_email(state.emails.ticket_confirmation(
            ticket_recipient(&ticket),
            ticket.id,
            &ticket.subject,
            &ticket.category,
            &ticket.priority,
        ))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Support ticket created successfully",
            "priority": response_window(&ticket.priority),
            "ticket": ticket,
        })),
    ))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TicketDetail>> {
    let ticket = load_own_ticket(&state, id, auth.user_id).await?;
    let messages = SupportTicket::messages(&state.db, ticket.id).await?;

    Ok(Json(TicketDetail { ticket, messages }))
}

/// Reply to an own ticket; a closed ticket is reopened
pub async fn reply_to_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<ReplyRequest>,
) -> ApiResult<Json<Value>> {
    let message = required(&req.message, "Message is required")?;
    let ticket = load_own_ticket(&state, id, auth.user_id).await?;

    let message_id =
        SupportTicket::add_message(&state.db, ticket.id, MessageAuthor::Customer(auth.user_id), message)
            .await?;

    Ok(Json(json!({ "success": true, "messageId": message_id })))
}

/// Owners may only open or close their tickets
pub async fn update_ticket_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let status = non_blank(&req.status)
        .filter(|s| USER_SETTABLE_STATUSES.contains(s))
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Invalid status. Users can only set status to: open or closed".to_string(),
            )
        })?;

    let ticket = load_own_ticket(&state, id, auth.user_id).await?;
    SupportTicket::update_fields(&state.db, ticket.id, Some(status), None).await?;

    let verb = if status == "closed" { "closed" } else { "reopened" };

    Ok(Json(json!({
        "success": true,
        "message": format!("Ticket {} successfully", verb),
    })))
}

pub async fn email_webhook_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "endpoint": "email-webhook",
        "message": "POST to this endpoint with the inbound email payload",
    }))
}

/// Inbound email reply
///
/// # Errors
///
/// - `400 Bad Request`: No `#<id>` in the subject, or no sender
/// - `403 Forbidden`: Sender is not the ticket's email address
/// - `404 Not Found`: Unknown ticket
pub async fn email_webhook(
    State(state): State<AppState>,
    Json(email): Json<InboundEmail>,
) -> ApiResult<Json<Value>> {
    let ticket_id = email
        .subject
        .as_deref()
        .and_then(parse_ticket_id)
        .ok_or_else(|| {
            tracing::debug!(subject = ?email.subject, "Inbound email without ticket number");
            ApiError::BadRequest("No ticket ID found".to_string())
        })?;

    let from = required(&email.from, "Sender is required")?;

    let ticket = SupportTicket::find_by_id(&state.db, ticket_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    let sender = normalize_sender(from);
    if sender != ticket.user_email.trim().to_lowercase() {
        tracing::warn!(ticket_id, %sender, "Inbound email from a different address than the ticket owner");
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }

    let body = non_blank(&email.text)
        .or_else(|| non_blank(&email.html))
        .unwrap_or_default();

    SupportTicket::add_message(&state.db, ticket.id, MessageAuthor::Customer(ticket.user_id), body)
        .await?;

    tracing::info!(ticket_id, "Email reply added to ticket");

    Ok(Json(json!({
        "success": true,
        "ticketId": ticket_id,
        "message": "Reply added successfully",
    })))
}
