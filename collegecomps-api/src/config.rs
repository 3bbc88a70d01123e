/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: users database, e.g. `sqlite://data/users.db` (required)
/// - `COLLEGE_DATABASE_URL`: read-only college facts database (optional)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `JWT_SECRET`: session signing secret, at least 32 characters (required)
/// - `APP_BASE_URL`: public site origin used in email links and redirects
/// - `CORS_ORIGINS`: comma-separated origins, `*` for permissive (default: `*`)
/// - `PRODUCTION`: `true` enables HSTS
/// - `ADMIN_EMAIL_DOMAIN`: email domain whose accounts are support staff
/// - `RESEND_API_KEY`, `EMAIL_FROM`, `SUPPORT_EMAIL`: email delivery
/// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`,
///   `STRIPE_PREMIUM_MONTHLY_PRICE_ID`, `STRIPE_PREMIUM_ANNUAL_PRICE_ID`: billing
///
/// # Example
///
/// ```no_run
/// use collegecomps_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Outbound email
    pub email: EmailConfig,

    /// Stripe billing
    pub stripe: StripeConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Public site origin, without trailing slash
    pub base_url: String,

    /// Allowed CORS origins (`*` for any)
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,

    /// Accounts with an email in this domain are staff
    pub admin_email_domain: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Users database URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// College facts database URL, opened read-only
    pub college_url: Option<String>,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Resend API key; without one, emails go to the in-memory outbox
    pub resend_api_key: Option<String>,

    pub from: String,

    pub support_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub premium_monthly_price_id: Option<String>,
    pub premium_annual_price_id: Option<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let production = env::var("PRODUCTION")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let base_url = optional("APP_BASE_URL").unwrap_or_else(|| {
            if production {
                "https://www.collegecomps.com".to_string()
            } else {
                "http://localhost:3000".to_string()
            }
        });

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                base_url: base_url.trim_end_matches('/').to_string(),
                cors_origins,
                production,
                admin_email_domain: optional("ADMIN_EMAIL_DOMAIN").unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                college_url: optional("COLLEGE_DATABASE_URL"),
            },
            jwt: JwtConfig {
                secret: jwt_secret,
            },
            email: EmailConfig {
                resend_api_key: optional("RESEND_API_KEY"),
                from: optional("EMAIL_FROM").unwrap_or_else(|| "noreply@collegecomps.com".to_string()),
                support_email: optional("SUPPORT_EMAIL")
                    .unwrap_or_else(|| "support@collegecomps.com".to_string()),
            },
            stripe: StripeConfig {
                secret_key: optional("STRIPE_SECRET_KEY"),
                webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
                premium_monthly_price_id: optional("STRIPE_PREMIUM_MONTHLY_PRICE_ID"),
                premium_annual_price_id: optional("STRIPE_PREMIUM_ANNUAL_PRICE_ID"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
