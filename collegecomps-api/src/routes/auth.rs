/// Authentication endpoints
///
/// This module provides account authentication endpoints:
/// - Signup with email verification
/// - Login
/// - Password reset by email
/// - Email verification
///
/// # Endpoints
///
/// - `POST /api/auth/signup` - Create an account
/// - `POST /api/auth/login` - Exchange credentials for a session token
/// - `POST /api/auth/forgot-password` - Email a reset link
/// - `POST /api/auth/reset-password` - Set a new password with a reset token
/// - `GET /api/auth/verify-email?token=` - Confirm an email address
/// - `POST /api/auth/resend-verification` - Email a fresh verification link

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{recipient, required},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use collegecomps_shared::{
    auth::{
        jwt::{self, Claims},
        middleware::AuthContext,
        password,
        tokens::{hash_token, issue_reset_token, issue_verification_token},
    },
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists with that email, a reset link has been sent.";

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Signup response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub user_id: i64,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Session token (30 days)
    pub access_token: String,

    /// Always `Bearer`
    pub token_type: String,

    /// Seconds until the token expires
    pub expires_in: i64,

    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a new account
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/signup
/// Content-Type: application/json
///
/// { "email": "student@example.com", "password": "correct horse", "name": "Sam" }
/// ```
///
/// # Response
///
/// ```json
/// { "success": true, "message": "Account created successfully", "userId": 1 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields or password under 8 characters
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Malformed email
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let email = normalize_email(required(&req.email, "Email and password are required")?);
    let raw_password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email and password are required".to_string()))?;

    req.validate()?;
    password::validate_password_length(raw_password).map_err(ApiError::BadRequest)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = password::hash_password(raw_password)?;

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    // The unique index still guards a concurrent signup for the same email
    let user = User::create(
        &state.db,
        CreateUser {
            email,
            password_hash: Some(password_hash),
            name,
            provider: "credentials".to_string(),
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::Conflict("User already exists".to_string())
        }
        other => other.into(),
    })?;

    let token = issue_verification_token();
    User::set_verification_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    state
        .send_email(state.emails.welcome(recipient(&user), &token.raw))
        .await;

    tracing::info!(user_id = user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "Account created successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "email": "student@example.com", "password": "correct horse" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields
/// - `401 Unauthorized`: Unknown email, OAuth-only account or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(required(&req.email, "Email and password are required")?);
    let raw_password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email and password are required".to_string()))?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    let Some(hash) = user.password_hash.as_deref() else {
        tracing::debug!(user_id = user.id, "Password login attempted on OAuth-only account");
        return Err(invalid());
    };

    if !password::verify_password(raw_password, hash)? {
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let claims = Claims::new(user.id, &user.email);
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: claims.expires_in_seconds(),
        user,
    }))
}

/// Request a password reset link
///
/// The response is identical whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let email = normalize_email(required(&req.email, "Email is required")?);

    match User::find_by_email(&state.db, &email).await? {
        Some(user) => {
            let token = issue_reset_token();
            User::set_reset_token(&state.db, user.id, &token.hash, token.expires_at).await?;

            state
                .send_email(state.emails.password_reset(recipient(&user), &token.raw))
                .await;

            tracing::info!(user_id = user.id, "Password reset requested");
        }
        None => {
            tracing::debug!("Password reset requested for unknown email");
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": RESET_REQUESTED_MESSAGE,
    })))
}

/// Set a new password using an emailed reset token
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, short password, unknown or expired token
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let token = required(&req.token, "Token and password are required")?;
    let new_password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Token and password are required".to_string()))?;

    password::validate_password_length(new_password).map_err(ApiError::BadRequest)?;

    let user = User::find_by_reset_token(&state.db, &hash_token(token))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset token".to_string()))?;

    match user.reset_token_expiry {
        Some(expiry) if expiry > Utc::now() => {}
        _ => return Err(ApiError::BadRequest("Reset token has expired".to_string())),
    }

    let password_hash = password::hash_password(new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = user.id, "Password reset completed");

    Ok(Json(json!({
        "success": true,
        "message": "Password has been reset successfully",
    })))
}

/// Confirm an email address from the verification link
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> ApiResult<Json<Value>> {
    let invalid = || ApiError::BadRequest("Invalid verification token".to_string());

    let token = query.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let token = token.ok_or_else(invalid)?;

    let user = User::find_by_verification_token(&state.db, &hash_token(token))
        .await?
        .ok_or_else(invalid)?;

    if user.email_verified {
        return Ok(Json(json!({
            "message": "Email already verified",
            "alreadyVerified": true,
        })));
    }

    match user.verification_token_expires {
        Some(expires) if expires > Utc::now() => {}
        _ => {
            return Err(ApiError::BadRequest(
                "Verification token has expired. Please request a new one.".to_string(),
            ))
        }
    }

    User::mark_email_verified(&state.db, user.id).await?;

    tracing::info!(user_id = user.id, "Email verified");

    Ok(Json(json!({
        "success": true,
        "message": "Email verified successfully!",
    })))
}

/// Email a fresh verification link to the signed-in user
pub async fn resend_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Err(ApiError::BadRequest("Email already verified".to_string()));
    }

    let token = issue_verification_token();
    User::set_verification_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    state
        .send_email(state.emails.verification_reminder(recipient(&user), &token.raw))
        .await;

    Ok(Json(json!({
        "success": true,
        "message": "Verification email sent",
    })))
}
