//! Aggregate stats handlers for the dashboard.
//!
//! Each endpoint computes windowed aggregates over one entity family.
//! Event and error stats default to a 7 day window, the rest to 30 days;
//! all accept an explicit `days` override.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::Caller;
use crate::api::dto::{EventStatsQuery, StatsWindowQuery};
use crate::app_state::AppState;
use crate::error::TelemetryError;

/// `GET /metrics/stats/events` — Event counts and unique users.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/stats/events",
    tag = "Stats",
    summary = "Get event statistics",
    description = "Event count and unique attributed users over the window, optionally restricted to one event type. Defaults to 7 days.",
    params(EventStatsQuery),
    responses(
        (status = 200, description = "Event statistics", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn event_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<EventStatsQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let days = query.days.unwrap_or(7).max(1);
    let stats = state
        .metrics
        .get_event_stats(query.event_type.as_deref(), days)
        .await?;

    Ok(Json(stats))
}

/// `GET /metrics/stats/matches` — Match aggregates.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/stats/matches",
    tag = "Stats",
    summary = "Get match statistics aggregates",
    description = "Match totals, completion rate, and averages over the window. Defaults to 30 days.",
    params(StatsWindowQuery),
    responses(
        (status = 200, description = "Match statistics", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn match_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<StatsWindowQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let stats = state
        .metrics
        .get_match_stats_aggregates(query.days_or(30))
        .await?;

    Ok(Json(stats))
}

/// `GET /metrics/stats/ads` — Ad impression aggregates.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/stats/ads",
    tag = "Stats",
    summary = "Get ad impression statistics",
    description = "Impression totals, completion rate, and average watch time over the window. Defaults to 30 days.",
    params(StatsWindowQuery),
    responses(
        (status = 200, description = "Ad statistics", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn ad_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<StatsWindowQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let stats = state.metrics.get_ad_stats(query.days_or(30)).await?;

    Ok(Json(stats))
}

/// `GET /metrics/stats/revenue-cost` — Revenue vs cost summary.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/stats/revenue-cost",
    tag = "Stats",
    summary = "Get revenue vs cost summary",
    description = "Revenue sums, total external cost, margin, and margin percentage over the window. Defaults to 30 days.",
    params(StatsWindowQuery),
    responses(
        (status = 200, description = "Revenue vs cost summary", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn revenue_cost_summary(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<StatsWindowQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let stats = state
        .metrics
        .get_revenue_cost_summary(query.days_or(30))
        .await?;

    Ok(Json(stats))
}

/// `GET /metrics/stats/errors` — Error totals and breakdowns.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/stats/errors",
    tag = "Stats",
    summary = "Get error statistics",
    description = "Error totals, resolution split, severity breakdown, and top error types over the window. Defaults to 7 days.",
    params(StatsWindowQuery),
    responses(
        (status = 200, description = "Error statistics", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn error_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<StatsWindowQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let stats = state.metrics.get_error_stats(query.days_or(7)).await?;

    Ok(Json(stats))
}

/// `GET /metrics/stats/performance` — API and database performance.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/stats/performance",
    tag = "Stats",
    summary = "Get performance statistics",
    description = "API latency, query timing, slow/failed percentages, and bottleneck counts keyed by `type_severity` over the window. Defaults to 30 days.",
    params(StatsWindowQuery),
    responses(
        (status = 200, description = "Performance statistics", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn performance_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<StatsWindowQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let stats = state.metrics.get_performance_stats(query.days_or(30)).await?;

    Ok(Json(stats))
}

/// Aggregate stats routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats/events", get(event_stats))
        .route("/stats/matches", get(match_stats))
        .route("/stats/ads", get(ad_stats))
        .route("/stats/revenue-cost", get(revenue_cost_summary))
        .route("/stats/errors", get(error_stats))
        .route("/stats/performance", get(performance_stats))
}
