/// Support tickets and their message threads
///
/// Tickets snapshot the requester's email, name and tier at creation so the
/// support queue keeps working if the account later changes. Priority comes
/// from the tier. Users may only open or close their own tickets; staff can
/// set any status and priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Every status a ticket can hold, in queue order
pub const TICKET_STATUSES: [&str; 6] = [
    "open",
    "reopened",
    "in_progress",
    "waiting_on_customer",
    "resolved",
    "closed",
];

/// Statuses a ticket owner may set
pub const USER_SETTABLE_STATUSES: [&str; 2] = ["open", "closed"];

pub const TICKET_PRIORITIES: [&str; 4] = ["low", "normal", "high", "urgent"];

/// `ORDER BY` fragment sorting active tickets first
const STATUS_ORDER: &str = r#"
    CASE status
        WHEN 'open' THEN 1
        WHEN 'reopened' THEN 1
        WHEN 'in_progress' THEN 2
        WHEN 'waiting_on_customer' THEN 3
        WHEN 'resolved' THEN 4
        WHEN 'closed' THEN 5
        ELSE 6
    END
"#;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SupportTicket {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub user_name: Option<String>,
    pub subscription_tier: String,
    pub subject: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub response_count: i64,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SupportMessage {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: Option<i64>,
    pub is_staff: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicket {
    pub user_id: i64,
    pub user_email: String,
    pub user_name: Option<String>,
    pub subscription_tier: String,
    pub subject: String,
    pub category: String,
    pub description: String,
    pub priority: String,
}

/// Staff-side filters for the ticket queue
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

/// Queue-wide counters for the admin view
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketStats {
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub in_progress_tickets: i64,
    pub resolved_tickets: i64,
    pub closed_tickets: i64,
    pub high_priority: i64,
    pub normal_priority: i64,
    pub low_priority: i64,
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAuthor {
    /// The ticket owner, in-app or by email reply
    Customer(i64),
    /// A staff member
    Staff(i64),
}

pub fn is_valid_status(status: &str) -> bool {
    TICKET_STATUSES.contains(&status)
}

pub fn is_valid_priority(priority: &str) -> bool {
    TICKET_PRIORITIES.contains(&priority)
}

/// Pulls the ticket number out of an email subject such as
/// `Re: [Ticket #42] Billing question`
///
/// ```
/// use collegecomps_shared::models::support_ticket::parse_ticket_id;
///
/// assert_eq!(parse_ticket_id("Re: [Ticket #42] Billing question"), Some(42));
/// assert_eq!(parse_ticket_id("No number here"), None);
/// ```
pub fn parse_ticket_id(subject: &str) -> Option<i64> {
    let mut rest = subject;
    while let Some(pos) = rest.find('#') {
        rest = &rest[pos + 1..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
    }
    None
}

/// Extracts the bare address from `Name <addr>` or `addr`, lowercased
///
/// ```
/// use collegecomps_shared::models::support_ticket::normalize_sender;
///
/// assert_eq!(normalize_sender("Jo <Jo@Example.com>"), "jo@example.com");
/// assert_eq!(normalize_sender("  jo@example.com "), "jo@example.com");
/// ```
pub fn normalize_sender(from: &str) -> String {
    let addr = match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from,
    };
    addr.trim().to_lowercase()
}

impl SupportTicket {
    pub async fn create(pool: &SqlitePool, data: CreateTicket) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SupportTicket>(
            r#"
            INSERT INTO support_tickets (
                user_id, user_email, user_name, subscription_tier,
                subject, category, description, priority
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.user_email)
        .bind(data.user_name)
        .bind(data.subscription_tier)
        .bind(data.subject)
        .bind(data.category)
        .bind(data.description)
        .bind(data.priority)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SupportTicket>("SELECT * FROM support_tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Owner's tickets, active first, newest first within a status
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT * FROM support_tickets WHERE user_id = ? ORDER BY {}, created_at DESC, id DESC",
            STATUS_ORDER
        );

        sqlx::query_as::<_, SupportTicket>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Staff queue with optional filters
    pub async fn list_filtered(
        pool: &SqlitePool,
        filter: &TicketFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder =
            sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT * FROM support_tickets WHERE 1 = 1");

        if let Some(status) = &filter.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(priority) = &filter.priority {
            builder.push(" AND priority = ").push_bind(priority.clone());
        }
        if let Some(category) = &filter.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }

        builder.push(
            r#"
            ORDER BY CASE priority
                WHEN 'urgent' THEN 1
                WHEN 'high' THEN 2
                WHEN 'normal' THEN 3
                ELSE 4
            END, created_at DESC, id DESC
            "#,
        );

        builder
            .build_query_as::<SupportTicket>()
            .fetch_all(pool)
            .await
    }

    pub async fn stats(pool: &SqlitePool) -> Result<TicketStats, sqlx::Error> {
        sqlx::query_as::<_, TicketStats>(
            r#"
            SELECT
                COUNT(*) AS total_tickets,
                COALESCE(SUM(CASE WHEN status IN ('open', 'reopened') THEN 1 ELSE 0 END), 0) AS open_tickets,
                COALESCE(SUM(CASE WHEN status = 'in_progress' THEN 1 ELSE 0 END), 0) AS in_progress_tickets,
                COALESCE(SUM(CASE WHEN status = 'resolved' THEN 1 ELSE 0 END), 0) AS resolved_tickets,
                COALESCE(SUM(CASE WHEN status = 'closed' THEN 1 ELSE 0 END), 0) AS closed_tickets,
                COALESCE(SUM(CASE WHEN priority IN ('high', 'urgent') THEN 1 ELSE 0 END), 0) AS high_priority,
                COALESCE(SUM(CASE WHEN priority = 'normal' THEN 1 ELSE 0 END), 0) AS normal_priority,
                COALESCE(SUM(CASE WHEN priority = 'low' THEN 1 ELSE 0 END), 0) AS low_priority
            FROM support_tickets
            "#,
        )
        .fetch_one(pool)
        .await
    }

    /// Sets status and/or priority; `resolved_at` follows the status
    pub async fn update_fields(
        pool: &SqlitePool,
        id: i64,
        status: Option<&str>,
        priority: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE support_tickets
            SET status = COALESCE(?1, status),
                priority = COALESCE(?2, priority),
                resolved_at = CASE
                    WHEN ?1 IN ('resolved', 'closed') THEN CURRENT_TIMESTAMP
                    WHEN ?1 IS NULL THEN resolved_at
                    ELSE NULL
                END,
                updated_at = CURRENT_TIMESTAMP,
                last_activity_at = CURRENT_TIMESTAMP
            WHERE id = ?3
            "#,
        )
        .bind(status)
        .bind(priority)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Thread for a ticket, oldest first, with author details
    pub async fn messages(pool: &SqlitePool, ticket_id: i64) -> Result<Vec<SupportMessage>, sqlx::Error> {
        sqlx::query_as::<_, SupportMessage>(
            r#"
            SELECT m.id, m.ticket_id, m.user_id, m.is_staff, m.message, m.created_at,
                   u.name AS author_name, u.email AS author_email
            FROM support_messages m
            LEFT JOIN users u ON m.user_id = u.id
            WHERE m.ticket_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(pool)
        .await
    }

    /// Appends a message and updates the ticket's activity counters
    ///
    /// Customer replies reopen a closed ticket. The first staff reply stamps
    /// `first_response_at`. Returns the new message id.
    pub async fn add_message(
        pool: &SqlitePool,
        ticket_id: i64,
        author: MessageAuthor,
        message: &str,
    ) -> Result<i64, sqlx::Error> {
        let (user_id, is_staff) = match author {
            MessageAuthor::Customer(id) => (id, false),
            MessageAuthor::Staff(id) => (id, true),
        };

        let mut tx = pool.begin().await?;

        let message_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO support_messages (ticket_id, user_id, is_staff, message)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(is_staff)
        .bind(message)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE support_tickets
            SET response_count = response_count + 1,
                status = CASE WHEN ?1 = 0 AND status = 'closed' THEN 'reopened' ELSE status END,
                first_response_at = CASE
                    WHEN ?1 = 1 THEN COALESCE(first_response_at, CURRENT_TIMESTAMP)
                    ELSE first_response_at
                END,
                last_activity_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?2
            "#,
        )
        .bind(is_staff)
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message_id)
    }
}
