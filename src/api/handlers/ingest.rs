//! Ingestion handlers: events, match stats, ad impressions, costs, revenue.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::auth::Caller;
use crate::api::dto::{
    BatchAcceptedResponse, CreateAdImpressionRequest, CreateCostRequest, CreateEventsRequest,
    CreateMatchStatsRequest, CreateRevenueRequest, CreatedResponse, MatchStatsRecordedResponse,
};
use crate::app_state::AppState;
use crate::error::TelemetryError;

/// `POST /metrics/events` — Ingest a batch of analytics events.
///
/// Always returns 202: per-event failures are counted, never raised.
///
/// # Errors
///
/// Returns [`TelemetryError::Unauthorized`] without a caller identity.
#[utoipa::path(
    post,
    path = "/metrics/events",
    tag = "Metrics",
    summary = "Ingest client/server events",
    description = "Accepts a batch of analytics events. Events are processed independently; events with an idempotency key are ingested at most once.",
    request_body = CreateEventsRequest,
    responses(
        (status = 202, description = "Events accepted for processing", body = BatchAcceptedResponse),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn ingest_events(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateEventsRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let events = req
        .events
        .into_iter()
        .map(|event| event.into_new_event(Some(caller.as_str())))
        .collect();
    let summary = state.metrics.ingest_events(events).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchAcceptedResponse::new("Events accepted", summary)),
    ))
}

/// `POST /metrics/match` — Record match statistics.
///
/// Repeated reports for the same match ID replace the previous record.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    post,
    path = "/metrics/match",
    tag = "Metrics",
    summary = "Record match statistics",
    description = "Records the outcome of one dining match. Upserts on match ID so clients can safely resubmit.",
    request_body = CreateMatchStatsRequest,
    responses(
        (status = 201, description = "Match stats recorded", body = MatchStatsRecordedResponse),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn record_match_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Json(req): Json<CreateMatchStatsRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let row = state.metrics.upsert_match_stats(&req.into_new_stats()).await?;

    Ok((
        StatusCode::CREATED,
        Json(MatchStatsRecordedResponse {
            message: "Match stats recorded".to_string(),
            match_id: row.match_id,
        }),
    ))
}

/// `POST /metrics/ad` — Record an ad impression.
///
/// # Errors
///
/// Returns [`TelemetryError::MissingUserAttribution`] when neither the
/// payload nor the caller provides a user.
#[utoipa::path(
    post,
    path = "/metrics/ad",
    tag = "Metrics",
    summary = "Record ad impression",
    description = "Records one ad impression. Impressions must be attributable to a user.",
    request_body = CreateAdImpressionRequest,
    responses(
        (status = 201, description = "Ad impression recorded", body = CreatedResponse),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
        (status = 409, description = "No user to attribute the impression to", body = serde_json::Value),
    )
)]
pub async fn record_ad_impression(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateAdImpressionRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let user_id = req.user_id.or(Some(caller));
    let row = state
        .metrics
        .create_ad_impression(user_id, req.placement, req.provider, req.watched_ms, req.completed)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse::new("Ad impression recorded", row.id)),
    ))
}

/// `POST /metrics/costs` — Record an external service cost.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    post,
    path = "/metrics/costs",
    tag = "Metrics",
    summary = "Record external service cost (admin)",
    description = "Records one external cost entry for margin reporting.",
    request_body = CreateCostRequest,
    responses(
        (status = 201, description = "Cost entry recorded", body = CreatedResponse),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn record_cost(
    State(state): State<AppState>,
    _caller: Caller,
    Json(req): Json<CreateCostRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    // TODO: restrict to admin callers once the role claim is forwarded.
    let row = state.metrics.create_cost(&req.into_new_cost()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse::new("Cost entry recorded", row.id)),
    ))
}

/// `POST /metrics/revenue` — Record a revenue entry.
///
/// # Errors
///
/// Returns [`TelemetryError::PersistenceError`] on database failure.
#[utoipa::path(
    post,
    path = "/metrics/revenue",
    tag = "Metrics",
    summary = "Record revenue entry (admin/webhook)",
    description = "Records one revenue entry for margin reporting.",
    request_body = CreateRevenueRequest,
    responses(
        (status = 201, description = "Revenue entry recorded", body = CreatedResponse),
        (status = 401, description = "Missing caller identity", body = serde_json::Value),
    )
)]
pub async fn record_revenue(
    State(state): State<AppState>,
    _caller: Caller,
    Json(req): Json<CreateRevenueRequest>,
) -> Result<impl IntoResponse, TelemetryError> {
    let row = state.metrics.create_revenue(&req.into_new_revenue()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse::new("Revenue entry recorded", row.id)),
    ))
}

/// Ingestion routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(ingest_events))
        .route("/match", post(record_match_stats))
        .route("/ad", post(record_ad_impression))
        .route("/costs", post(record_cost))
        .route("/revenue", post(record_revenue))
}
