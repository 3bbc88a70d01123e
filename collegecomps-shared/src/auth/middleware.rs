/// Session authentication middleware for Axum
///
/// Validates `Authorization: Bearer <jwt>` headers, loads the user row and
/// places an [`AuthContext`] in the request extensions.
///
/// Two variants are provided:
/// - [`session_auth_middleware`] rejects requests without a valid session (401)
/// - [`optional_session_middleware`] attaches a context when one is present and
///   lets every request through, for routes that answer anonymous callers too
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use collegecomps_shared::auth::middleware::{session_auth_middleware, AuthContext};
/// use sqlx::SqlitePool;
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// fn routes(pool: SqlitePool, secret: String) -> Router {
///     Router::new()
///         .route("/me", get(me))
///         .layer(middleware::from_fn(move |req, next| {
///             session_auth_middleware(pool.clone(), secret.clone(), req, next)
///         }))
/// }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::authorization::SubscriptionTier;
use super::jwt::{extract_bearer_token, validate_token, JwtError};
use crate::models::user::User;

/// Authenticated caller, added to request extensions
///
/// Built from the user row on every request, so `tier` and `role` are never
/// older than the request itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
    pub tier: SubscriptionTier,
    pub role: String,
}

impl AuthContext {
    /// Builds a context from a user row
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            tier: SubscriptionTier::from_db(&user.subscription_tier),
            role: user.role.clone(),
        }
    }

    /// Checks if the caller is on a paid tier
    pub fn is_premium(&self) -> bool {
        self.tier.has_minimum_tier(SubscriptionTier::Premium)
    }
}

/// Error type for session authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Authentication required")]
    MissingCredentials,

    /// Header present but not a bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token invalid, expired or for a deleted user
    #[error("{0}")]
    InvalidToken(String),

    /// Database error while loading the user
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AuthError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::DatabaseError(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = match &self {
            AuthError::DatabaseError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({ "error": error, "message": message })),
        )
            .into_response()
    }
}

/// Resolves an `Authorization` header value to an [`AuthContext`]
///
/// # Errors
///
/// - `InvalidFormat` if the header is not a bearer token
/// - `InvalidToken` if the JWT fails validation or the user no longer exists
/// - `DatabaseError` if the user lookup fails
pub async fn resolve_session(
    pool: &SqlitePool,
    secret: &str,
    header_value: &str,
) -> Result<AuthContext, AuthError> {
    let token = extract_bearer_token(header_value)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Session expired".to_string()),
        _ => AuthError::InvalidToken("Invalid session".to_string()),
    })?;

    let user = User::find_by_id(pool, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AuthError::InvalidToken("Invalid session".to_string()))?;

    Ok(AuthContext::from_user(&user))
}

/// Requires a valid session
pub async fn session_auth_middleware(
    pool: SqlitePool,
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let context = resolve_session(&pool, &secret, auth_header).await?;

    tracing::debug!(user_id = context.user_id, "Session authenticated");
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Attaches a session when one is valid, never rejects
///
/// Handlers read it as `Option<Extension<AuthContext>>`.
pub async fn optional_session_middleware(
    pool: SqlitePool,
    secret: String,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(value) = auth_header {
        match resolve_session(&pool, &secret, &value).await {
            Ok(context) => {
                req.extensions_mut().insert(context);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unusable session on optional route");
            }
        }
    }

    next.run(req).await
}
