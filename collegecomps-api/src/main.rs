//! # CollegeComps API Server
//!
//! HTTP API behind the CollegeComps college comparison site: accounts,
//! saved comparisons, crowd-sourced salaries, Stripe billing and support
//! tickets.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=sqlite://data/users.db JWT_SECRET=... cargo run -p collegecomps-api
//! ```

use collegecomps_api::{
    app::{build_router, AppState},
    config::Config,
};
use collegecomps_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collegecomps_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "CollegeComps API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let college_pool = match &config.database.college_url {
        Some(url) => {
            let college = create_pool(DatabaseConfig {
                url: url.clone(),
                max_connections: config.database.max_connections,
                read_only: true,
                ..Default::default()
            })
            .await;

            match college {
                Ok(pool) => Some(pool),
                Err(e) => {
                    // Only the health check reads it; keep serving accounts
                    tracing::error!(error = %e, "College database unavailable");
                    None
                }
            }
        }
        None => None,
    };

    let bind_address = config.bind_address();

    let mut state = AppState::new(pool.clone(), config)?;
    if let Some(college) = college_pool {
        state = state.with_college_db(college);
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
