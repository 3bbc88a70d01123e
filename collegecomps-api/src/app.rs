/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use collegecomps_api::{app::AppState, config::Config};
/// use collegecomps_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(pool, config)?;
/// let app = collegecomps_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use collegecomps_shared::{
    auth::middleware::{optional_session_middleware, session_auth_middleware, AuthError},
    billing::{PriceCatalog, StripeClient},
    email::{templates::EmailContext, Mailer, OutboxMailer, OutgoingEmail, ResendMailer},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Users database pool
    pub db: SqlitePool,

    /// Read-only college facts database, when configured
    pub college_db: Option<SqlitePool>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound email
    pub mailer: Arc<dyn Mailer>,

    /// Link and template settings for outbound email
    pub emails: Arc<EmailContext>,

    /// Stripe client, when `STRIPE_SECRET_KEY` is set
    pub stripe: Option<StripeClient>,

    /// Stripe price ids
    pub prices: Arc<PriceCatalog>,
}

impl AppState {
    /// Creates application state, choosing the mailer and Stripe client from
    /// the configuration
    pub fn new(db: SqlitePool, config: Config) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match &config.email.resend_api_key {
            Some(key) => Arc::new(ResendMailer::new(key.clone(), config.email.from.clone())?),
            None => {
                tracing::warn!("RESEND_API_KEY not set, emails will only be logged");
                Arc::new(OutboxMailer::new())
            }
        };

        let stripe = match &config.stripe.secret_key {
            Some(key) => Some(StripeClient::new(key.clone())?),
            None => None,
        };

        let emails = EmailContext::new(
            config.api.base_url.clone(),
            config.jwt.secret.clone(),
            config.email.support_email.clone(),
        );

        let prices = PriceCatalog {
            premium_monthly: config.stripe.premium_monthly_price_id.clone(),
            premium_annual: config.stripe.premium_annual_price_id.clone(),
        };

        Ok(Self {
            db,
            college_db: None,
            config: Arc::new(config),
            mailer,
            emails: Arc::new(emails),
            stripe,
            prices: Arc::new(prices),
        })
    }

    /// Replaces the mailer
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Attaches the college facts database
    pub fn with_college_db(mut self, college_db: SqlitePool) -> Self {
        self.college_db = Some(college_db);
        self
    }

    /// Replaces the Stripe client
    pub fn with_stripe(mut self, stripe: StripeClient) -> Self {
        self.stripe = Some(stripe);
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Staff email domain
    pub fn admin_domain(&self) -> &str {
        &self.config.api.admin_email_domain
    }

    /// Sends an email, logging rather than returning any failure
    ///
    /// Email is never allowed to fail the request that triggered it.
    pub async fn send_email(&self, email: OutgoingEmail) {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = self.mailer.send(email).await {
            tracing::warn!(
                mailer = self.mailer.name(),
                to = %to,
                subject = %subject,
                error = %e,
                "Failed to send email"
            );
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── /health                         public
/// ├── /auth/{signup,login,forgot-password,reset-password,verify-email}   public
/// ├── /auth/resend-verification       session
/// ├── /user/{me,profile,password,salary-submissions,usage-stats}         session
/// ├── /user/{onboarding,responses}    session
/// ├── /alerts/preferences             session, premium
/// ├── /salary-data                    GET public, POST session
/// ├── /saved-comparisons[/move,/tags] session (move/tags premium)
/// ├── /comparison-folders             session, premium
/// ├── /exports/share                  POST session, premium
/// ├── /exports/share/:token           public
/// ├── /exports/comparison             session, premium
/// ├── /bookmarks/colleges             session
/// ├── /bookmarks/colleges/check       optional session
/// ├── /analytics/{track,stats}        session
/// ├── /stripe/{checkout,portal}       session
/// ├── /stripe/webhook                 public, signature-checked
/// ├── /support/tickets[/:id]          session
/// ├── /support/email-webhook          public, sender-checked
/// ├── /admin/support/tickets[/:id]    session, staff
/// └── /unsubscribe                    public, token-checked
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/auth/reset-password", post(routes::auth::reset_password))
        .route("/auth/verify-email", get(routes::auth::verify_email))
        .route("/salary-data", get(routes::salary::salary_aggregates))
        .route("/exports/share/:token", get(routes::exports::view_share))
        .route("/stripe/webhook", post(routes::stripe::webhook))
        .route(
            "/support/email-webhook",
            get(routes::support::email_webhook_status).post(routes::support::email_webhook),
        )
        .route(
            "/unsubscribe",
            get(routes::unsubscribe::unsubscribe_link).post(routes::unsubscribe::update_preferences),
        );

    let optional_routes = Router::new()
        .route("/bookmarks/colleges/check", get(routes::bookmarks::check_bookmark))
        .layer(from_fn_with_state(state.clone(), attach_session));

    let session_routes = Router::new()
        .route("/auth/resend-verification", post(routes::auth::resend_verification))
        .route("/user/me", get(routes::user::me))
        .route(
            "/user/profile",
            get(routes::user::get_profile).put(routes::user::update_profile),
        )
        .route("/user/password", put(routes::user::change_password))
        .route("/user/salary-submissions", get(routes::user::salary_submissions))
        .route("/user/usage-stats", get(routes::user::usage_stats))
        .route(
            "/user/onboarding",
            get(routes::user::get_onboarding).post(routes::user::save_onboarding),
        )
        .route(
            "/user/responses",
            get(routes::user::get_responses)
                .post(routes::user::save_responses)
                .put(routes::user::save_responses)
                .delete(routes::user::delete_responses),
        )
        .route(
            "/alerts/preferences",
            get(routes::alerts::get_preferences).post(routes::alerts::save_preferences),
        )
        .route("/salary-data", post(routes::salary::submit_salary))
        .route(
            "/saved-comparisons",
            get(routes::comparisons::list_comparisons)
                .post(routes::comparisons::create_comparison)
                .delete(routes::comparisons::delete_comparison),
        )
        .route("/saved-comparisons/move", post(routes::comparisons::move_comparison))
        .route(
            "/saved-comparisons/tags",
            post(routes::comparisons::add_tag).delete(routes::comparisons::remove_tag),
        )
        .route(
            "/comparison-folders",
            get(routes::folders::list_folders)
                .post(routes::folders::create_folder)
                .delete(routes::folders::delete_folder),
        )
        .route("/exports/share", post(routes::exports::create_share))
        .route("/exports/comparison", post(routes::exports::export_comparison))
        .route(
            "/bookmarks/colleges",
            get(routes::bookmarks::list_bookmarks).post(routes::bookmarks::update_bookmark),
        )
        .route("/analytics/track", post(routes::analytics::track))
        .route("/analytics/stats", get(routes::analytics::stats))
        .route("/stripe/checkout", post(routes::stripe::checkout))
        .route("/stripe/portal", post(routes::stripe::portal))
        .route(
            "/support/tickets",
            get(routes::support::list_tickets).post(routes::support::create_ticket),
        )
        .route(
            "/support/tickets/:id",
            get(routes::support::get_ticket)
                .post(routes::support::reply_to_ticket)
                .patch(routes::support::update_ticket_status),
        )
        .route("/admin/support/tickets", get(routes::admin::list_tickets))
        .route(
            "/admin/support/tickets/:id",
            get(routes::admin::get_ticket)
                .post(routes::admin::reply_to_ticket)
                .patch(routes::admin::update_ticket),
        )
        .layer(from_fn_with_state(state.clone(), require_session));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(session_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Rejects requests without a valid session
async fn require_session(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    session_auth_middleware(state.db.clone(), state.jwt_secret().to_string(), req, next).await
}

/// Attaches a session when present
async fn attach_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    optional_session_middleware(state.db.clone(), state.jwt_secret().to_string(), req, next).await
}
