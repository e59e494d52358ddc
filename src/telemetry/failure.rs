//! Last-resort failure capture.
//!
//! Every error response (4xx/5xx) leaving the router is reshaped into the
//! standard error envelope, recorded as a server-side error log, and
//! error-logged to the console. Service errors attach a [`CapturedError`]
//! extension on the way out; responses from anywhere else (extractor
//! rejections, the fallback 404) are classified from their status band
//! and their body is salvaged for the message.
//!
//! The error-log write runs fire-and-forget; its failure is logged and
//! never retried, so a broken store cannot make error responses fail.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::ExtensionRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::api::auth::CallerId;
use crate::app_state::AppState;
use crate::error::CapturedError;
use crate::store::models::NewErrorLog;
use crate::telemetry::request_logger::{client_ip, full_path, header_str};

/// Upper bound on how much of an error body is read back for the message.
const SALVAGE_LIMIT: usize = 64 * 1024;

/// Reshapes error responses into the error envelope and records them.
pub async fn capture_failures(
    State(state): State<AppState>,
    connect_info: Result<ConnectInfo<SocketAddr>, ExtensionRejection>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = full_path(&request);
    let query = request.uri().query().map(ToString::to_string);
    let user_id = request
        .extensions()
        .get::<CallerId>()
        .map(|caller| caller.0.clone());
    let user_agent = header_str(request.headers(), "user-agent");
    let ip_address = client_ip(request.headers(), connect_info.ok());

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let captured = response.extensions().get::<CapturedError>().cloned();
    let (message, detail) = match captured {
        Some(captured) => (captured.message, captured.detail),
        None => (salvage_message(response, status).await, None),
    };

    tracing::error!(
        status = status.as_u16(),
        method = %method,
        path = %path,
        message = %message,
        "request failed"
    );

    let log = NewErrorLog {
        user_id: user_id.clone(),
        session_id: None,
        error_type: classify_error_type(status).to_string(),
        error_message: message.clone(),
        stack_trace: detail.clone(),
        context: Some(json!({ "userId": user_id, "query": query })),
        severity: classify_severity(status).to_string(),
        source: "server".to_string(),
        route: Some(path.clone()),
        method: Some(method),
        status_code: Some(i32::from(status.as_u16())),
        user_agent,
        ip_address,
    };
    let metrics = Arc::clone(&state.metrics);
    tokio::spawn(async move {
        if let Err(err) = metrics.record_server_error(&log).await {
            tracing::error!(error = %err, "failed to record server error");
        }
    });

    let mut envelope = json!({
        "statusCode": status.as_u16(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "path": path,
        "message": message,
    });
    if !state.config.is_production()
        && let (Some(body), Some(detail)) = (envelope.as_object_mut(), detail)
    {
        body.insert("stack".to_string(), Value::String(detail));
    }

    let mut response = Json(envelope).into_response();
    *response.status_mut() = status;
    response
}

/// Error type from the status band, mirroring the log taxonomy consumed
/// by the dashboard.
fn classify_error_type(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNAUTHORIZED => "AuthenticationError",
        StatusCode::FORBIDDEN => "AuthorizationError",
        StatusCode::NOT_FOUND => "NotFoundError",
        StatusCode::BAD_REQUEST => "ValidationError",
        s if s.is_client_error() => "ClientError",
        s if s.is_server_error() => "ServerError",
        _ => "UnknownError",
    }
}

fn classify_severity(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "critical"
    } else if status.is_client_error() {
        "error"
    } else {
        "warning"
    }
}

/// Pulls a human-readable message out of an error response produced
/// outside the service error type.
async fn salvage_message(response: Response, status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    };

    let Ok(bytes) = axum::body::to_bytes(response.into_body(), SALVAGE_LIMIT).await else {
        return fallback();
    };
    if bytes.is_empty() {
        return fallback();
    }
    if let Ok(value) = serde_json::from_slice::<Value>(&bytes)
        && let Some(message) = value.get("message").and_then(Value::as_str)
    {
        return message.to_string();
    }
    match std::str::from_utf8(&bytes) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => fallback(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn error_types_follow_status_bands() {
        assert_eq!(
            classify_error_type(StatusCode::UNAUTHORIZED),
            "AuthenticationError"
        );
        assert_eq!(
            classify_error_type(StatusCode::FORBIDDEN),
            "AuthorizationError"
        );
        assert_eq!(classify_error_type(StatusCode::NOT_FOUND), "NotFoundError");
        assert_eq!(
            classify_error_type(StatusCode::BAD_REQUEST),
            "ValidationError"
        );
        assert_eq!(classify_error_type(StatusCode::CONFLICT), "ClientError");
        assert_eq!(
            classify_error_type(StatusCode::INTERNAL_SERVER_ERROR),
            "ServerError"
        );
    }

    #[test]
    fn severity_is_critical_only_for_server_errors() {
        assert_eq!(classify_severity(StatusCode::INTERNAL_SERVER_ERROR), "critical");
        assert_eq!(classify_severity(StatusCode::BAD_GATEWAY), "critical");
        assert_eq!(classify_severity(StatusCode::BAD_REQUEST), "error");
        assert_eq!(classify_severity(StatusCode::NOT_FOUND), "error");
    }

    #[tokio::test]
    async fn salvages_message_from_json_bodies() {
        let response = (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "events must not be empty" })),
        )
            .into_response();
        let message = salvage_message(response, StatusCode::UNPROCESSABLE_ENTITY).await;
        assert_eq!(message, "events must not be empty");
    }

    #[tokio::test]
    async fn salvages_plain_text_bodies() {
        let response = (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        let message = salvage_message(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(message, "Invalid JSON");
    }

    #[tokio::test]
    async fn empty_bodies_fall_back_to_the_canonical_reason() {
        let response = StatusCode::NOT_FOUND.into_response();
        let message = salvage_message(response, StatusCode::NOT_FOUND).await;
        assert_eq!(message, "Not Found");
    }
}
