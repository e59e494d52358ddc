//! Error log handlers: reporting, resolution, and filtered reads.
//!
//! `POST /metrics/errors` is the one public route in the crate: crashed
//! clients report errors before they can authenticate. Everything else
//! requires a caller identity.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::{Caller, MaybeCaller};
use crate::api::dto::{
    BatchAcceptedResponse, CreateErrorLogRequest, CreateErrorLogsRequest, CreatedResponse,
    ErrorLogListQuery, Paginated, UpdateErrorLogRequest,
};
use crate::app_state::AppState;
use crate::error::TelemetryError;

/// `POST /metrics/errors` — Report a single error (public).
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    post,
    path = "/metrics/errors",
    tag = "Errors",
    summary = "Report an error",
    description = "Records one error report. Public: crashed clients report here before they can authenticate. Unauthenticated reports may attribute themselves through `context.userId`.",
    request_body = CreateErrorLogRequest,
    responses(
        (status = 201, description = "Error log recorded", body = CreatedResponse),
        (status = 500, description = "Storage failure", body = serde_json::Value),
    )
)]
pub async fn create_error_log(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Json(req): Json<CreateErrorLogRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let log = req.into_new_log(caller.as_deref());
    let row = state.metrics.create_error_log(&log).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse::new("Error log recorded", row.id)),
    ))
}

/// `POST /metrics/errors/batch` — Report a batch of errors.
///
/// Always returns 202: per-item failures are counted, never raised.
///
/// # Errors
///
/// Returns [`TelemetryError::Unauthorized`] without a caller identity.
#[utoipa::path(
    post,
    path = "/metrics/errors/batch",
    tag = "Errors",
    summary = "Report errors in batch",
    description = "Accepts a batch of error reports. Reports are processed independently.",
    request_body = CreateErrorLogsRequest,
    responses(
        (status = 202, description = "Error logs accepted for processing", body = BatchAcceptedResponse),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn create_error_logs(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateErrorLogsRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let logs = req
        .errors
        .into_iter()
        .map(|dto| dto.into_new_log(Some(caller.as_str())))
        .collect();
    let summary = state.metrics.create_error_logs(logs).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchAcceptedResponse::new("Error logs accepted", summary)),
    ))
}

/// `GET /metrics/errors` — List error logs, newest first.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    get,
    path = "/metrics/errors",
    tag = "Errors",
    summary = "List error logs",
    description = "Returns error logs matching the filters, newest first, with the unpaginated total. Defaults to the retention window when no `days` is given.",
    params(ErrorLogListQuery),
    responses(
        (status = 200, description = "Paginated error logs", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn list_error_logs(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<ErrorLogListQuery>,
) -> Result<impl IntoResponse, TelemetryError> {
    let filter = query.into_filter(state.config.retention_days);
    let (records, total) = state.metrics.get_error_logs(&filter).await?;

    Ok(Json(Paginated::new(
        records,
        total,
        filter.limit,
        filter.offset,
    )))
}

/// `PATCH /metrics/errors/{id}` — Resolve or unresolve an error log.
///
/// # Errors
///
/// Returns [`TelemetryError::ErrorLogNotFound`] for an unknown ID.
#[utoipa::path(
    patch,
    path = "/metrics/errors/{id}",
    tag = "Errors",
    summary = "Update error resolution state",
    description = "Marks an error log resolved or unresolved. Unresolving clears the resolution timestamp but keeps the resolver unless a new one is given.",
    params(
        ("id" = uuid::Uuid, Path, description = "Error log UUID"),
    ),
    request_body = UpdateErrorLogRequest,
    responses(
        (status = 200, description = "Updated error log", body = serde_json::Value),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
        (status = 404, description = "Error log not found", body = serde_json::Value),
    )
)]
pub async fn update_error_log(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateErrorLogRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let row = state
        .metrics
        .update_error_log(id, req.resolved, req.resolved_by)
        .await?;

    Ok(Json(row))
}

/// Error log routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/errors", post(create_error_log).get(list_error_logs))
        .route("/errors/batch", post(create_error_logs))
        .route("/errors/{id}", patch(update_error_log))
}
