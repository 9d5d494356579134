use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use consult_core::{CoreConfig, SummaryMode, WorkerPool};

/// Main entry point for the consultation service
///
/// Starts the REST server and, in asynchronous summary mode, an in-process worker pool
/// draining the summary job queue. Both stop on Ctrl-C; the pool finishes its in-flight
/// jobs first.
///
/// # Environment Variables
/// - `DATABASE_PATH`: SQLite database file (default: "consultations.db")
/// - `REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `SUMMARY_MODE`: `sync` (default) or `async`
/// - `AI_PROVIDER`: `openai` (default), `ollama` or `mock`
///
/// # Returns
/// * `Ok(())` - If the server runs and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("consult_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("consult_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::from_lookup(|key| std::env::var(key).ok())?);
    let state = AppState::from_config(&cfg)?;

    tracing::info!(
        "++ Starting consultation service on {} (summary mode: {:?}, provider: {:?})",
        cfg.rest_addr(),
        cfg.summary_mode(),
        cfg.ai().provider
    );

    let pool = match cfg.summary_mode() {
        SummaryMode::Async => Some(WorkerPool::start(
            state.jobs.queue().clone(),
            state.summaries.clone(),
            state.jobs.notifier(),
            *cfg.worker(),
        )?),
        SummaryMode::Sync => None,
    };

    let app = router(state, cfg.cors_allowed_origins());
    let listener = tokio::net::TcpListener::bind(cfg.rest_addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl-C: {e}");
            }
        })
        .await?;

    if let Some(pool) = pool {
        pool.shutdown().await;
    }

    Ok(())
}
