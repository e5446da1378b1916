//! Hookline server binary.
//!
//! Wires the adapters together: PostgreSQL event store, HTTP receiver,
//! and the scheduled batch processor, with graceful shutdown for both.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use hookline::adapters::http::{webhook_router, WebhookAppState};
use hookline::adapters::{HandlerRegistry, PostgresWebhookEventRepository, TracingAlertNotifier};
use hookline::application::ProcessPendingEventsHandler;
use hookline::config::AppConfig;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    let repository = Arc::new(PostgresWebhookEventRepository::new(pool));

    // Business handlers for each event type register here. An event type
    // with no registered handler fails processing and escalates through
    // the normal retry/alert path.
    let registry = Arc::new(HandlerRegistry::new());

    let processor = Arc::new(ProcessPendingEventsHandler::with_config(
        repository.clone(),
        registry,
        Arc::new(TracingAlertNotifier),
        config.processor.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor_task = tokio::spawn({
        let processor = processor.clone();
        async move { processor.run(shutdown_rx).await }
    });

    let state = WebhookAppState {
        repository,
        providers: config.providers.clone(),
    };
    let app = webhook_router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "webhook receiver listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
        })
        .await?;

    // Stop the processor after the listener has drained.
    let _ = shutdown_tx.send(true);
    processor_task.await?;

    Ok(())
}
