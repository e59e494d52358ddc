//! Service error types with HTTP status code mapping.
//!
//! [`TelemetryError`] is the central error type. Each variant maps to an
//! HTTP status code; [`IntoResponse`] emits the status plus a minimal JSON
//! body and stashes a [`CapturedError`] in the response extensions so the
//! failure-capture middleware can build the full error envelope and record
//! the failure without re-parsing the body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error details attached to a response by [`TelemetryError::into_response`].
///
/// The failure-capture middleware reads this from the response extensions
/// to classify the failure and, outside production, surface `detail` as the
/// `stack` field of the error envelope.
#[derive(Debug, Clone)]
pub struct CapturedError {
    /// Human-readable error message.
    pub message: String,
    /// Debug representation of the underlying error, when it adds anything
    /// beyond the message.
    pub detail: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No caller identity on a route that requires one.
    #[error("missing caller identity")]
    Unauthorized,

    /// Error log with the given ID was not found.
    #[error("error log not found: {0}")]
    ErrorLogNotFound(uuid::Uuid),

    /// Performance bottleneck log with the given ID was not found.
    #[error("performance bottleneck log not found: {0}")]
    BottleneckNotFound(uuid::Uuid),

    /// Operation requires a user attribution that could not be resolved.
    #[error("user ID is required for ad impressions")]
    MissingUserAttribution,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TelemetryError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ErrorLogNotFound(_) | Self::BottleneckNotFound(_) => StatusCode::NOT_FOUND,
            Self::MissingUserAttribution => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let detail = match &self {
            Self::PersistenceError(inner) | Self::Internal(inner) => Some(inner.clone()),
            _ => None,
        };
        let body = serde_json::json!({
            "statusCode": status.as_u16(),
            "message": message,
        });
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
            .extensions_mut()
            .insert(CapturedError { message, detail });
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            TelemetryError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TelemetryError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TelemetryError::ErrorLogNotFound(uuid::Uuid::new_v4()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TelemetryError::MissingUserAttribution.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TelemetryError::PersistenceError("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn into_response_attaches_captured_error() {
        let response = TelemetryError::MissingUserAttribution.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let Some(captured) = response.extensions().get::<CapturedError>() else {
            panic!("expected CapturedError extension");
        };
        assert_eq!(captured.message, "user ID is required for ad impressions");
        assert!(captured.detail.is_none());
    }
}
