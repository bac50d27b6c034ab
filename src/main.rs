// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use greenhouse_telemetry::application::ingestion_service::{IngestionService, PipelineState};
use greenhouse_telemetry::application::telemetry_source::run_ingest_loop;
use greenhouse_telemetry::infrastructure::config::load_settings;
use greenhouse_telemetry::infrastructure::mqtt_source::MqttSource;
use greenhouse_telemetry::presentation::app_state::AppState;
use greenhouse_telemetry::presentation::handlers::{
    get_metric, get_series, get_snapshot, get_thresholds, health_check, stream_snapshots,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings().context("failed to load configuration")?;

    // Create pipeline state (application layer)
    let windowed = settings.windowed_metrics();
    let state = Arc::new(
        PipelineState::new(&windowed, settings.window.capacity, settings.classifier())
            .with_unlisted_limit(settings.snapshot.max_unlisted_metrics),
    );
    let ingestion_service = IngestionService::new(state);

    // Broker client feeds the pipeline from its own task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let source = MqttSource::new(&settings.mqtt);
    let ingest_task = tokio::spawn(run_ingest_loop(
        source,
        ingestion_service.clone(),
        shutdown_rx.clone(),
    ));

    // Create application state
    let app_state = Arc::new(AppState {
        ingestion_service,
        stream_keep_alive: settings.http.stream_keep_alive(),
        shutdown: shutdown_rx,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/snapshot", get(get_snapshot))
        .route("/snapshot/stream", get(stream_snapshots))
        .route("/metrics/:metric", get(get_metric))
        .route("/series/:metric", get(get_series))
        .route("/thresholds", get(get_thresholds))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start server
    let addr: SocketAddr = settings
        .http
        .bind
        .parse()
        .with_context(|| format!("invalid http.bind address {}", settings.http.bind))?;
    tracing::info!(%addr, topic=%settings.mqtt.topic, "starting greenhouse-telemetry service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error=%err, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
            // Stops the receive loop and open snapshot streams; the last snapshot stays as it was
            let _ = shutdown_tx.send(true);
        })
        .await?;

    match ingest_task.await? {
        Ok(summary) => tracing::info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "ingest finished"
        ),
        Err(err) => tracing::error!(error=%err, "ingest loop failed"),
    }

    Ok(())
}
