//! Request logging middleware.
//!
//! Wraps the full lifecycle of one HTTP request: establishes the
//! request-scoped attribution context around the inner handler, measures
//! latency and body sizes, and hands an [`ApiRequestRecord`] to the store
//! once the response is on its way out. Persistence runs fire-and-forget
//! on a spawned task, so a logging failure never touches the response.
//! Requests above the endpoint latency threshold additionally raise a
//! `slow_endpoint` bottleneck.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::rejection::ExtensionRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::json;

use crate::api::auth::CallerId;
use crate::app_state::AppState;
use crate::telemetry::context::{self, RequestContext};
use crate::telemetry::detector::LatencyThresholds;
use crate::telemetry::record::{ApiRequestRecord, BottleneckRecord};

/// Measures one request and records its outcome.
///
/// Failed responses (4xx/5xx) are logged with a response size of zero and
/// never raise a bottleneck; the latency of a failure is not an endpoint
/// performance signal.
pub async fn track_requests(
    State(state): State<AppState>,
    connect_info: Result<ConnectInfo<SocketAddr>, ExtensionRejection>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let method = request.method().to_string();
    let route = full_path(&request);
    let user_id = request
        .extensions()
        .get::<CallerId>()
        .map(|caller| caller.0.clone());
    let user_agent = header_str(request.headers(), "user-agent");
    let request_size = header_str(request.headers(), "content-length")
        .and_then(|value| value.parse::<i64>().ok());
    let ip_address = client_ip(request.headers(), connect_info.ok());

    // Attribution context lives exactly as long as the inner handler;
    // nothing to clear on either exit path.
    let request_context = RequestContext {
        user_id: user_id.clone(),
        route: Some(route.clone()),
    };
    let response = context::scope(request_context, next.run(request)).await;

    let latency_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
    let status = response.status();
    let failed = status.is_client_error() || status.is_server_error();
    let response_size = if failed {
        Some(0)
    } else {
        response
            .body()
            .size_hint()
            .exact()
            .and_then(|bytes| i64::try_from(bytes).ok())
    };

    let record = ApiRequestRecord {
        route: route.clone(),
        method: method.clone(),
        status: i32::from(status.as_u16()),
        latency_ms,
        request_size,
        response_size,
        user_id: user_id.clone(),
        ip_address,
        user_agent,
    };
    let metrics = Arc::clone(&state.metrics);
    tokio::spawn(async move {
        if let Err(err) = metrics.record_api_request(&record).await {
            tracing::debug!(error = %err, "failed to log api request");
        }
    });

    if !failed {
        let thresholds = LatencyThresholds::new(
            state.config.slow_endpoint_threshold_ms,
            state.config.critical_endpoint_threshold_ms,
        );
        if let Some(severity) = thresholds.classify(latency_ms) {
            let record = BottleneckRecord {
                bottleneck_type: "slow_endpoint".to_string(),
                severity,
                threshold: thresholds.slow,
                actual_value: latency_ms,
                resource: Some(format!("{method} {route}")),
                details: Some(json!({
                    "route": route,
                    "method": method,
                    "latencyMs": latency_ms,
                    "requestSize": request_size,
                    "responseSize": response_size,
                })),
                user_id,
            };
            let metrics = Arc::clone(&state.metrics);
            tokio::spawn(async move {
                if let Err(err) = metrics.record_bottleneck(&record).await {
                    tracing::debug!(error = %err, "failed to log performance bottleneck");
                }
            });
        }
    }

    response
}

/// Request path including the query string, matching what callers sent.
pub(crate) fn full_path(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string())
}

pub(crate) fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Client IP: first `x-forwarded-for` entry when a proxy set one, else
/// the peer socket address.
pub(crate) fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|value| {
            value
                .split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(ToString::to_string)
        })
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_header_wins_over_socket_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let info = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(
            client_ip(&headers, Some(info)).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn socket_address_is_the_fallback() {
        let info = ConnectInfo(SocketAddr::from(([192, 168, 1, 9], 443)));
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(info)).as_deref(),
            Some("192.168.1.9")
        );
    }

    #[test]
    fn missing_sources_yield_no_ip() {
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn full_path_keeps_the_query_string() {
        let request = Request::builder()
            .uri("/metrics/errors?days=7&limit=10")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(full_path(&request), "/metrics/errors?days=7&limit=10");
    }
}
