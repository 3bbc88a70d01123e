/// Integration tests for support tickets, the inbound email webhook and the
/// staff queue

mod common;

use axum::http::StatusCode;
use collegecomps_shared::models::support_ticket::SupportTicket;
use common::TestContext;
use serde_json::json;

fn ticket_body() -> serde_json::Value {
    json!({
        "subject": "Cannot export comparison",
        "category": "technical",
        "description": "The CSV download never starts.",
    })
}

#[tokio::test]
async fn test_create_ticket_sets_priority_and_emails() {
    let ctx = TestContext::new().await.unwrap();
    let free = ctx.random_user().await.unwrap();
    let premium = ctx.premium_user().await.unwrap();

    let response = ctx
        .post("/api/support/tickets", ticket_body(), Some(&ctx.token_for(&free)))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    assert_eq!(response.body["ticket"]["priority"], "low");

    let confirmation = ctx.outbox.last_to(&free.email).expect("confirmation email");
    let ticket_id = response.body["ticket"]["id"].as_i64().unwrap();
    assert!(confirmation.subject.contains(&format!("#{}", ticket_id)));

    let response = ctx
        .post("/api/support/tickets", ticket_body(), Some(&ctx.token_for(&premium)))
        .await;
    assert_eq!(response.body["ticket"]["priority"], "normal");
}

#[tokio::test]
async fn test_create_ticket_requires_fields() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.random_user().await.unwrap();

    let response = ctx
        .post(
            "/api/support/tickets",
            json!({ "subject": "Help", "category": "billing" }),
            Some(&ctx.token_for(&user)),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tickets_are_owner_scoped() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.random_user().await.unwrap();
    let other = ctx.random_user().await.unwrap();

    let created = ctx
        .post("/api/support/tickets", ticket_body(), Some(&ctx.token_for(&owner)))
        .await;
    let ticket_id = created.body["ticket"]["id"].as_i64().unwrap();
    let uri = format!("/api/support/tickets/{}", ticket_id);

    let response = ctx.get(&uri, Some(&ctx.token_for(&other))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx.get(&uri, Some(&ctx.token_for(&owner))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ticket"]["subject"], "Cannot export comparison");
}

#[tokio::test]
async fn test_owner_status_changes() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.random_user().await.unwrap();
    let token = ctx.token_for(&owner);

    let created = ctx.post("/api/support/tickets", ticket_body(), Some(&token)).await;
    let ticket_id = created.body["ticket"]["id"].as_i64().unwrap();
    let uri = format!("/api/support/tickets/{}", ticket_id);

    let response = ctx.patch(&uri, json!({ "status": "resolved" }), Some(&token)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.patch(&uri, json!({ "status": "closed" }), Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["message"], "Ticket closed successfully");

    // A reply on a closed ticket reopens it
    let response = ctx
        .post(&uri, json!({ "message": "Still broken" }), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);

    let ticket = SupportTicket::find_by_id(&ctx.db, ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.status, "reopened");
    assert_eq!(ticket.response_count, 1);
}

#[tokio::test]
async fn test_email_webhook_checks_sender() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.random_user().await.unwrap();

    let created = ctx
        .post("/api/support/tickets", ticket_body(), Some(&ctx.token_for(&owner)))
        .await;
    let ticket_id = created.body["ticket"]["id"].as_i64().unwrap();
    let subject = format!("Re: [Ticket #{}] Cannot export comparison", ticket_id);

    let spoofed = ctx
        .post(
            "/api/support/email-webhook",
            json!({ "from": "Mallory <mallory@example.com>", "subject": subject, "text": "hi" }),
            None,
        )
        .await;
    assert_eq!(spoofed.status, StatusCode::FORBIDDEN);

    let no_number = ctx
        .post(
            "/api/support/email-webhook",
            json!({ "from": owner.email, "subject": "Re: hello", "text": "hi" }),
            None,
        )
        .await;
    assert_eq!(no_number.status, StatusCode::BAD_REQUEST);

    let unknown = ctx
        .post(
            "/api/support/email-webhook",
            json!({ "from": owner.email, "subject": "Re: [Ticket #999999]", "text": "hi" }),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let accepted = ctx
        .post(
            "/api/support/email-webhook",
            json!({
                "from": format!("Owner <{}>", owner.email.to_uppercase()),
                "subject": subject,
                "text": "Here is a screenshot",
            }),
            None,
        )
        .await;
    assert_eq!(accepted.status, StatusCode::OK, "{}", accepted.text);
    assert_eq!(accepted.body["ticketId"], ticket_id);

    let messages = SupportTicket::messages(&ctx.db, ticket_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message, "Here is a screenshot");
    assert!(!messages[0].is_staff);

    let status = ctx.get("/api/support/email-webhook", None).await;
    assert_eq!(status.body["status"], "ok");
}

#[tokio::test]
async fn test_staff_queue() {
    let ctx = TestContext::new().await.unwrap();
    let customer = ctx.random_user().await.unwrap();
    let staff = ctx.create_user("agent@staff.collegecomps.com").await.unwrap();

    let created = ctx
        .post("/api/support/tickets", ticket_body(), Some(&ctx.token_for(&customer)))
        .await;
    let ticket_id = created.body["ticket"]["id"].as_i64().unwrap();

    let denied = ctx
        .get("/api/admin/support/tickets", Some(&ctx.token_for(&customer)))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let token = ctx.token_for(&staff);
    let queue = ctx.get("/api/admin/support/tickets?status=open", Some(&token)).await;
    assert_eq!(queue.status, StatusCode::OK, "{}", queue.text);
    assert_eq!(queue.body["tickets"].as_array().map(Vec::len), Some(1));
    assert_eq!(queue.body["stats"]["open_tickets"], 1);

    let uri = format!("/api/admin/support/tickets/{}", ticket_id);
    let reply = ctx
        .post(&uri, json!({ "message": "Try a different browser." }), Some(&token))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);

    let notice = ctx.outbox.last_to(&customer.email).expect("reply email");
    assert!(notice.html.contains("Try a different browser."));

    let invalid = ctx.patch(&uri, json!({ "priority": "critical" }), Some(&token)).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let updated = ctx
        .patch(&uri, json!({ "status": "in_progress", "priority": "high" }), Some(&token))
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.text);

    let ticket = SupportTicket::find_by_id(&ctx.db, ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.status, "in_progress");
    assert_eq!(ticket.priority, "high");
    assert!(ticket.first_response_at.is_some());
}
