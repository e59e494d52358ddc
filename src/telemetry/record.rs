//! Write-side records produced by the telemetry pipeline.
//!
//! These are the payloads the observer, buffer, and request middleware hand
//! to the store. They carry everything the insert needs; background tasks
//! never reach back into request state.

use serde_json::Value;

use crate::telemetry::detector::BottleneckSeverity;

/// One buffered database query log entry.
#[derive(Debug, Clone)]
pub struct QueryLogRecord {
    /// Operation descriptor in `Model.action` form; never raw SQL.
    pub query: String,
    /// Sanitized argument payload, when the operation had one.
    pub params: Option<Value>,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: i64,
    /// Logical entity name.
    pub model: Option<String>,
    /// Action name (`create`, `findMany`, ...).
    pub operation: Option<String>,
    /// Caller ID from the request context, when inside a request.
    pub user_id: Option<String>,
    /// Route from the request context, when inside a request.
    pub route: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message for failed operations.
    pub error_message: Option<String>,
}

/// One detected performance bottleneck.
#[derive(Debug, Clone)]
pub struct BottleneckRecord {
    /// Bottleneck kind: `slow_query` or `slow_endpoint`.
    pub bottleneck_type: String,
    /// Classified severity.
    pub severity: BottleneckSeverity,
    /// Threshold in milliseconds that was exceeded.
    pub threshold: i64,
    /// Measured value in milliseconds.
    pub actual_value: i64,
    /// What was slow: `Model.action` or `METHOD /path`.
    pub resource: Option<String>,
    /// Structured details for the dashboard.
    pub details: Option<Value>,
    /// Caller ID, when attributable.
    pub user_id: Option<String>,
}

/// One completed HTTP request.
#[derive(Debug, Clone)]
pub struct ApiRequestRecord {
    /// Request route (path and query).
    pub route: String,
    /// HTTP method.
    pub method: String,
    /// Response status code.
    pub status: i32,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: i64,
    /// Request body size in bytes, when known.
    pub request_size: Option<i64>,
    /// Response body size in bytes; zero for error responses.
    pub response_size: Option<i64>,
    /// Caller ID, when authenticated.
    pub user_id: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}
