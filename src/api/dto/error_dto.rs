//! Error log DTOs: reporting, resolution, and filtered reads.

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::store::models::{ErrorLogFilter, NewErrorLog};

/// Request body for `POST /metrics/errors`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateErrorLogRequest {
    /// Error type or category (e.g. `ValidationError`, `NetworkError`).
    pub error_type: String,
    /// Error message.
    pub error_message: String,
    /// Stack trace, when available.
    #[serde(default)]
    pub stack_trace: Option<String>,
    /// Additional context as key-value pairs.
    #[serde(default)]
    pub context: Option<Value>,
    /// Severity level (`error`, `warning`, `critical`). Defaults to `error`.
    #[serde(default)]
    pub severity: Option<String>,
    /// Origin of the report (`server`, `client`, `native-app`, `web`).
    /// Defaults to `server`.
    #[serde(default)]
    pub source: Option<String>,
    /// API route, when applicable.
    #[serde(default)]
    pub route: Option<String>,
    /// HTTP method, when applicable.
    #[serde(default)]
    pub method: Option<String>,
    /// HTTP status code, when applicable.
    #[serde(default)]
    pub status_code: Option<i32>,
    /// Reporting user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Reporting IP address.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Session ID for correlation.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl CreateErrorLogRequest {
    /// Converts into an insert payload.
    ///
    /// The authenticated caller wins over a user carried in the context
    /// payload; unauthenticated reports may still attribute themselves
    /// through `context.userId`.
    #[must_use]
    pub fn into_new_log(self, caller: Option<&str>) -> NewErrorLog {
        let context_user = self
            .context
            .as_ref()
            .and_then(|ctx| ctx.get("userId"))
            .and_then(Value::as_str)
            .map(ToString::to_string);

        NewErrorLog {
            user_id: caller.map(ToString::to_string).or(context_user),
            session_id: self.session_id,
            error_type: self.error_type,
            error_message: self.error_message,
            stack_trace: self.stack_trace,
            context: self.context,
            severity: self.severity.unwrap_or_else(|| "error".to_string()),
            source: self.source.unwrap_or_else(|| "server".to_string()),
            route: self.route,
            method: self.method,
            status_code: self.status_code,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
        }
    }
}

/// Request body for `POST /metrics/errors/batch`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateErrorLogsRequest {
    /// Error reports to ingest.
    pub errors: Vec<CreateErrorLogRequest>,
}

/// Request body for `PATCH /metrics/errors/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateErrorLogRequest {
    /// Resolution state to transition to; omit to leave unchanged.
    #[serde(default)]
    pub resolved: Option<bool>,
    /// User who resolved the error.
    #[serde(default)]
    pub resolved_by: Option<String>,
}

/// Query parameters for `GET /metrics/errors`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ErrorLogListQuery {
    /// Filter by severity.
    #[serde(default)]
    pub severity: Option<String>,
    /// Filter by error type.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Filter by resolution state.
    #[serde(default)]
    pub resolved: Option<bool>,
    /// Filter by report source.
    #[serde(default)]
    pub source: Option<String>,
    /// Filter by attributed user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Lookback window in days.
    #[serde(default)]
    pub days: Option<i64>,
    /// Page size, up to 1000. Defaults to 100.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Page offset. Defaults to 0.
    #[serde(default)]
    pub offset: Option<i64>,
}

impl ErrorLogListQuery {
    /// Converts into a store filter, applying the retention default when
    /// no explicit window was requested.
    #[must_use]
    pub fn into_filter(self, default_days: i64) -> ErrorLogFilter {
        ErrorLogFilter {
            since: Utc::now() - Duration::days(self.days.unwrap_or(default_days)),
            severity: self.severity,
            error_type: self.error_type,
            resolved: self.resolved,
            source: self.source,
            user_id: self.user_id,
            limit: self.limit.unwrap_or(100).clamp(1, 1000),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn caller_wins_over_context_user() {
        let dto: CreateErrorLogRequest = serde_json::from_value(json!({
            "errorType": "NetworkError",
            "errorMessage": "request timed out",
            "context": { "userId": "ctx-user" },
        }))
        .unwrap();

        let log = dto.into_new_log(Some("caller-user"));
        assert_eq!(log.user_id.as_deref(), Some("caller-user"));
    }

    #[test]
    fn context_user_attributes_unauthenticated_reports() {
        let dto: CreateErrorLogRequest = serde_json::from_value(json!({
            "errorType": "AuthenticationError",
            "errorMessage": "token expired",
            "context": { "userId": "ctx-user" },
            "source": "native-app",
        }))
        .unwrap();

        let log = dto.into_new_log(None);
        assert_eq!(log.user_id.as_deref(), Some("ctx-user"));
        assert_eq!(log.source, "native-app");
        assert_eq!(log.severity, "error");
    }

    #[test]
    fn list_query_applies_retention_and_paging_defaults() {
        let query: ErrorLogListQuery = serde_json::from_value(json!({})).unwrap();
        let filter = query.into_filter(30);

        let window = Utc::now() - filter.since;
        assert_eq!(window.num_days(), 30);
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 0);
        assert!(filter.severity.is_none());
    }

    #[test]
    fn list_query_clamps_oversized_pages() {
        let query: ErrorLogListQuery =
            serde_json::from_value(json!({ "limit": 50_000, "offset": -3, "days": 7 })).unwrap();
        let filter = query.into_filter(30);

        assert_eq!(filter.limit, 1000);
        assert_eq!(filter.offset, 0);
        assert_eq!((Utc::now() - filter.since).num_days(), 7);
    }
}
