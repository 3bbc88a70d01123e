/// User model and database operations
///
/// This module provides the User model and the queries behind sign-up,
/// login, credential resets, email verification and subscription changes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     email TEXT NOT NULL UNIQUE COLLATE NOCASE,
///     password_hash TEXT,
///     name TEXT,
///     provider TEXT NOT NULL DEFAULT 'credentials',
///     role TEXT NOT NULL DEFAULT 'user',
///     subscription_tier TEXT NOT NULL DEFAULT 'free',
///     subscription_status TEXT NOT NULL DEFAULT 'active',
///     subscription_expires_at TEXT,
///     stripe_customer_id TEXT,
///     email_verified INTEGER NOT NULL DEFAULT 0,
///     verification_token TEXT UNIQUE,
///     verification_token_expires TEXT,
///     reset_token TEXT UNIQUE,
///     reset_token_expiry TEXT,
///     email_preferences TEXT NOT NULL,
///     created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
///     updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
///     last_login_at TEXT
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use collegecomps_shared::models::user::{CreateUser, User};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "student@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     name: Some("Student".to_string()),
///     provider: "credentials".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "STUDENT@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;

/// Which marketing and digest emails a user receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPreferences {
    #[serde(default = "enabled")]
    pub marketing: bool,

    #[serde(default = "enabled")]
    pub product_updates: bool,

    #[serde(default = "enabled")]
    pub weekly_digest: bool,
}

fn enabled() -> bool {
    true
}

impl Default for EmailPreferences {
    fn default() -> Self {
        Self::all(true)
    }
}

impl EmailPreferences {
    /// Every category set to `value`
    pub fn all(value: bool) -> Self {
        Self {
            marketing: value,
            product_updates: value,
            weekly_digest: value,
        }
    }
}

/// User account
///
/// Credential secrets (password hash, token hashes) are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Email address, unique case-insensitively
    pub email: String,

    /// Argon2id PHC hash, `None` for OAuth-only accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Optional display name
    pub name: Option<String>,

    /// Sign-in provider (`credentials`, `google`, ...)
    pub provider: String,

    /// `user` or `admin`
    pub role: String,

    /// `free` or `premium`
    pub subscription_tier: String,

    /// Mirrors the Stripe subscription status (`active`, `canceled`, `expired`, ...)
    pub subscription_status: String,

    /// End of the paid period when the subscription is set to lapse
    pub subscription_expires_at: Option<DateTime<Utc>>,

    /// Stripe customer, set once checkout completes
    pub stripe_customer_id: Option<String>,

    /// Whether the email address has been verified
    pub email_verified: bool,

    /// SHA-256 of the outstanding verification token
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,

    #[serde(skip_serializing)]
    pub verification_token_expires: Option<DateTime<Utc>>,

    /// SHA-256 of the outstanding password reset token
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,

    #[serde(skip_serializing)]
    pub reset_token_expiry: Option<DateTime<Utc>>,

    /// Email opt-ins
    pub email_preferences: Json<EmailPreferences>,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address, already trimmed and lowercased by the caller
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: Option<String>,

    /// Optional display name
    pub name: Option<String>,

    /// Sign-in provider
    pub provider: String,
}

/// Subscription fields written by the billing webhook
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate {
    pub tier: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Left unchanged when `None`
    pub stripe_customer_id: Option<String>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns a database error with `is_unique_violation()` set when the
    /// email is already registered.
    pub async fn create(pool: &SqlitePool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, provider)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .bind(data.provider)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    ///
    /// The column is declared `COLLATE NOCASE`, so lookup is case-insensitive.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Finds the user holding a reset token, by the token's SHA-256 hash
    ///
    /// Expiry is not checked here; callers distinguish "unknown" from "expired".
    pub async fn find_by_reset_token(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE reset_token = ?")
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Finds the user holding a verification token, by the token's SHA-256 hash
    pub async fn find_by_verification_token(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE verification_token = ?")
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by Stripe customer id
    pub async fn find_by_stripe_customer(
        pool: &SqlitePool,
        customer_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE stripe_customer_id = ?")
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Stores a reset token hash, replacing any outstanding one
    pub async fn set_reset_token(
        pool: &SqlitePool,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = ?, reset_token_expiry = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets a new password hash and clears any reset token
    pub async fn update_password(
        pool: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?,
                reset_token = NULL,
                reset_token_expiry = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a verification token hash, replacing any outstanding one
    pub async fn set_verification_token(
        pool: &SqlitePool,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verification_token = ?, verification_token_expires = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks the email verified and clears the verification token
    pub async fn mark_email_verified(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = 1,
                verification_token = NULL,
                verification_token_expires = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the display name
    pub async fn update_name(pool: &SqlitePool, id: i64, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    pub async fn update_last_login(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Applies a subscription change
    pub async fn update_subscription(
        pool: &SqlitePool,
        id: i64,
        update: SubscriptionUpdate,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_tier = ?,
                subscription_status = ?,
                subscription_expires_at = ?,
                stripe_customer_id = COALESCE(?, stripe_customer_id),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(update.tier)
        .bind(update.status)
        .bind(update.expires_at)
        .bind(update.stripe_customer_id)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the email opt-ins
    pub async fn update_email_preferences(
        pool: &SqlitePool,
        id: i64,
        preferences: EmailPreferences,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET email_preferences = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(Json(preferences))
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the account role
    pub async fn set_role(pool: &SqlitePool, id: i64, role: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Whether the account can sign in with a password
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}
