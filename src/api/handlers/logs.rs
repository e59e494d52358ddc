//! Observability read handlers: query logs and performance bottlenecks.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::Caller;
use crate::api::dto::{
    BottleneckListQuery, Paginated, QueryLogListQuery, UpdateBottleneckRequest,
};
use crate::app_state::AppState;
use crate::error::TelemetryError;

/// `GET /metrics/database-queries` — List database query logs, newest
/// first.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/database-queries",
    tag = "Logs",
    summary = "List database query logs",
    description = "Returns query logs matching the filters, newest first, with the unpaginated total. Defaults to the retention window when no `days` is given.",
    params(QueryLogListQuery),
    responses(
        (status = 200, description = "Paginated query logs", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn list_query_logs(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<QueryLogListQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let filter = query.into_filter(state.config.retention_days);
    let (records, total) = state.metrics.get_database_query_logs(&filter).await?;

    Ok(Json(Paginated::new(
        records,
        total,
        filter.limit,
        filter.offset,
    )))
}

/// `GET /metrics/performance-bottlenecks` — List detected bottlenecks,
/// newest first.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/performance-bottlenecks",
    tag = "Logs",
    summary = "List performance bottlenecks",
    description = "Returns bottleneck events matching the filters, newest first, with the unpaginated total. Defaults to the retention window when no `days` is given.",
    params(BottleneckListQuery),
    responses(
        (status = 200, description = "Paginated bottleneck events", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn list_bottlenecks(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<BottleneckListQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let filter = query.into_filter(state.config.retention_days);
    let (records, total) = state.metrics.get_performance_bottlenecks(&filter).await?;

    Ok(Json(Paginated::new(
        records,
        total,
        filter.limit,
        filter.offset,
    )))
}

/// `PATCH /metrics/performance-bottlenecks/{id}` — Resolve or unresolve
/// a bottleneck.
///
/// # Errors
///
/// Returns [`TelemetryError::BottleneckNotFound`] for an unknown ID.
#[utoipa::path(
    patch,
    path = "/metrics/performance-bottlenecks/{id}",
    tag = "Logs",
    summary = "Update bottleneck resolution state",
    description = "Marks a bottleneck resolved or unresolved. Unresolving clears both the resolution timestamp and the resolver.",
    params(
        ("id" = uuid::Uuid, Path, description = "Bottleneck UUID"),
    ),
    request_body = UpdateBottleneckRequest,
    responses(
        (status = 200, description = "Updated bottleneck", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
        (status = 404, description = "Bottleneck not found", body = serde_json::Value),
    )
)]
pub async fn update_bottleneck(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBottleneckRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let row = state
        .metrics
        .update_performance_bottleneck(id, req.resolved, req.resolved_by)
        .await?;

    Ok(Json(row))
}

/// Observability read routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/database-queries", get(list_query_logs))
        .route("/performance-bottlenecks", get(list_bottlenecks))
        .route("/performance-bottlenecks/{id}", patch(update_bottleneck))
}
