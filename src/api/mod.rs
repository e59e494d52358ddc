//! REST API layer: caller resolution, route handlers, DTOs, and router composition.
//!
//! All metrics endpoints are mounted under `/metrics`; the health check
//! stays at the root.

pub mod auth;
pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Forkcast Metrics API",
        description = "Telemetry ingestion and aggregate statistics for the Forkcast platform."
    ),
    paths(
        handlers::system::health_handler,
        handlers::ingest::ingest_events,
        handlers::ingest::record_match_stats,
        handlers::ingest::record_ad_impression,
        handlers::ingest::record_cost,
        handlers::ingest::record_revenue,
        handlers::errors::create_error_log,
        handlers::errors::create_error_logs,
        handlers::errors::list_error_logs,
        handlers::errors::update_error_log,
        handlers::logs::list_query_logs,
        handlers::logs::list_bottlenecks,
        handlers::logs::update_bottleneck,
        handlers::stats::event_stats,
        handlers::stats::match_stats,
        handlers::stats::ad_stats,
        handlers::stats::revenue_cost_summary,
        handlers::stats::error_stats,
        handlers::stats::performance_stats,
    ),
    tags(
        (name = "Metrics", description = "Event, match, and monetization ingestion"),
        (name = "Errors", description = "Error log reporting and triage"),
        (name = "Logs", description = "Query log and bottleneck inspection"),
        (name = "Stats", description = "Windowed aggregate statistics"),
        (name = "System", description = "Health and service metadata"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/metrics", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/docs")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
