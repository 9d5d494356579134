//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without an in-process summary worker pool.
//!
//! ## Intended use
//! Useful for development, or for deployments that run `consult worker` as a separate
//! process. The workspace's main `consult-run` binary runs the REST server and the worker
//! pool together.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use consult_core::{CoreConfig, SummaryMode};

/// Main entry point for the standalone REST API server
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the database cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("consult_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let state = AppState::from_config(&cfg)?;

    if cfg.summary_mode() == SummaryMode::Async {
        tracing::warn!("SUMMARY_MODE=async: queued summaries need a running `consult worker`");
    }

    tracing::info!("-- Starting consultation REST API on {}", cfg.rest_addr());

    let app = router(state, cfg.cors_allowed_origins());
    let listener = tokio::net::TcpListener::bind(cfg.rest_addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
