//! forkcast-metrics server entry point.
//!
//! Starts the Axum HTTP server, the Postgres pool, and the telemetry
//! pipeline, and drains buffered query logs on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use forkcast_metrics::api;
use forkcast_metrics::api::auth::resolve_caller;
use forkcast_metrics::app_state::AppState;
use forkcast_metrics::config::TelemetryConfig;
use forkcast_metrics::service::MetricsService;
use forkcast_metrics::store::MetricsStore;
use forkcast_metrics::telemetry::failure::capture_failures;
use forkcast_metrics::telemetry::request_logger::track_requests;
use forkcast_metrics::telemetry::sink::TelemetrySink;
use forkcast_metrics::telemetry::{
    BufferSettings, LatencyThresholds, QueryLogBuffer, QueryObserver,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = TelemetryConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        environment = %config.environment,
        "starting forkcast-metrics"
    );

    // Connect to Postgres
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    tracing::info!("database pool established");

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    // Build the telemetry pipeline
    let store = MetricsStore::new(pool.clone());
    let sink: Arc<dyn TelemetrySink> = Arc::new(store.clone());
    let buffer = QueryLogBuffer::new(
        BufferSettings {
            enabled: config.query_log_enabled,
            flush_size: config.query_log_flush_size,
            flush_interval: Duration::from_millis(config.query_log_flush_interval_ms),
            capacity: config.query_log_buffer_capacity,
        },
        Arc::clone(&sink),
    );
    let observer = QueryObserver::new(
        buffer.clone(),
        Arc::clone(&sink),
        config.query_log_threshold_ms,
        LatencyThresholds::new(
            config.slow_query_threshold_ms,
            config.critical_query_threshold_ms,
        ),
    );

    // Build service layer
    let metrics = Arc::new(MetricsService::new(
        store,
        observer,
        config.slow_query_threshold_ms,
        config.slow_endpoint_threshold_ms,
    ));

    // Build application state
    let app_state = AppState {
        metrics,
        config: Arc::new(config.clone()),
    };

    // Build router. Requests pass through the layers last-added first, so
    // the caller identity is resolved before either telemetry middleware
    // runs, and on the way back out the request logger sees error responses
    // before capture_failures envelopes them.
    let app = api::build_router()
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            track_requests,
        ))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            capture_failures,
        ))
        .layer(middleware::from_fn(resolve_caller))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Drain pending query logs while the pool is still open.
    buffer.flush().await;
    pool.close().await;
    tracing::info!("shutdown complete");

    Ok(())
}

/// Resolves when the process receives ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c; shutting down"),
        () = terminate => tracing::info!("received sigterm; shutting down"),
    }
}
