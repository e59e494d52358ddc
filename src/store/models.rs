//! Database row models for the telemetry tables.
//!
//! Fields mirror the column names; JSON serialization is camelCase to match
//! the wire contract the dashboards and clients consume.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Insert payload for an analytics event.
///
/// Serialization is camelCase because these payloads double as the argument
/// snapshot captured by the query observer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    /// Resolved user attribution.
    pub user_id: Option<String>,
    /// Client session ID.
    pub session_id: String,
    /// Event type discriminator.
    pub event_type: String,
    /// Event payload.
    pub properties: serde_json::Value,
    /// Emitting surface.
    pub source: String,
    /// Deduplication key.
    pub idempotency_key: Option<String>,
}

/// Insert/replace payload for match statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMatchStats {
    /// Business key.
    pub match_id: String,
    /// Match mode.
    pub mode: String,
    /// Vote rule.
    pub vote_rule: String,
    /// Participant count.
    pub participants: i32,
    /// Cards presented.
    pub cards_presented: i32,
    /// Cards liked.
    pub cards_liked: i32,
    /// Seconds to decision.
    pub time_to_decision_seconds: Option<i32>,
    /// Winning restaurant.
    pub result_restaurant_id: Option<String>,
    /// Completion flag.
    pub completed: bool,
}

/// Insert payload for an ad impression.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdImpression {
    /// Watching user.
    pub user_id: String,
    /// Placement slot.
    pub placement: String,
    /// Ad provider.
    pub provider: Option<String>,
    /// Watch time in milliseconds.
    pub watched_ms: i64,
    /// Completion flag.
    pub completed: bool,
}

/// Insert payload for an external cost entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExternalCost {
    /// External service name.
    pub service: String,
    /// Billing unit.
    pub unit: String,
    /// Units consumed.
    pub quantity: Decimal,
    /// Cost per unit in USD.
    pub unit_cost: Decimal,
    /// Billing period start.
    pub period_start: NaiveDate,
    /// Billing period end.
    pub period_end: NaiveDate,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Insert payload for a revenue entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRevenue {
    /// Paying user.
    pub user_id: Option<String>,
    /// Revenue source.
    pub source: String,
    /// Plan name.
    pub plan: String,
    /// Gross amount in USD.
    pub amount_gross: Decimal,
    /// Fees in USD.
    pub fees: Decimal,
    /// Net amount in USD.
    pub amount_net: Decimal,
    /// Subscription period start.
    pub period_start: Option<NaiveDate>,
    /// Subscription period end.
    pub period_end: Option<NaiveDate>,
    /// External reference.
    pub external_ref: Option<String>,
}

/// Insert payload for an error log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewErrorLog {
    /// User attribution.
    pub user_id: Option<String>,
    /// Client session ID.
    pub session_id: Option<String>,
    /// Error category.
    pub error_type: String,
    /// Error message.
    pub error_message: String,
    /// Stack trace.
    pub stack_trace: Option<String>,
    /// Structured context.
    pub context: Option<serde_json::Value>,
    /// Severity.
    pub severity: String,
    /// Reporting surface.
    pub source: String,
    /// Route.
    pub route: Option<String>,
    /// HTTP method.
    pub method: Option<String>,
    /// HTTP status code.
    pub status_code: Option<i32>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

/// Filter for error-log reads. `since` is always applied; the rest narrow
/// the result set when present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogFilter {
    /// Lower bound on `created_at`.
    pub since: DateTime<Utc>,
    /// Severity equality filter.
    pub severity: Option<String>,
    /// Error type equality filter.
    pub error_type: Option<String>,
    /// Resolution state filter.
    pub resolved: Option<bool>,
    /// Reporting surface filter.
    pub source: Option<String>,
    /// User attribution filter.
    pub user_id: Option<String>,
    /// Page size.
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// Filter for database-query-log reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogFilter {
    /// Lower bound on `created_at`.
    pub since: DateTime<Utc>,
    /// Entity name filter.
    pub model: Option<String>,
    /// Action name filter.
    pub operation: Option<String>,
    /// Minimum execution time in milliseconds.
    pub min_execution_time: Option<i64>,
    /// User attribution filter.
    pub user_id: Option<String>,
    /// Route filter.
    pub route: Option<String>,
    /// Success flag filter.
    pub success: Option<bool>,
    /// Page size.
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// Filter for performance-bottleneck reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckFilter {
    /// Lower bound on `created_at`.
    pub since: DateTime<Utc>,
    /// Bottleneck kind filter.
    #[serde(rename = "type")]
    pub bottleneck_type: Option<String>,
    /// Severity filter.
    pub severity: Option<String>,
    /// Resolution state filter.
    pub resolved: Option<bool>,
    /// Resource equality filter.
    pub resource: Option<String>,
    /// Page size.
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// A row from the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    /// Row ID.
    pub id: Uuid,
    /// User the event is attributed to, when known.
    pub user_id: Option<String>,
    /// Client-generated session ID.
    pub session_id: String,
    /// Event type discriminator (e.g. `match_created`).
    pub event_type: String,
    /// Schemaless event payload.
    pub properties: serde_json::Value,
    /// Emitting surface (`native-app`, `web`, `server`).
    pub source: String,
    /// Client-supplied deduplication key.
    pub idempotency_key: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `match_stats` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatsRow {
    /// Row ID.
    pub id: Uuid,
    /// Business key; one row per match.
    pub match_id: String,
    /// Match mode (`solo`, `group`).
    pub mode: String,
    /// Vote rule (`majority`, `unanimous`, `first_to_x`).
    pub vote_rule: String,
    /// Number of participants.
    pub participants: i32,
    /// Restaurant cards presented.
    pub cards_presented: i32,
    /// Cards liked.
    pub cards_liked: i32,
    /// Seconds from start to decision, when the match finished.
    pub time_to_decision_seconds: Option<i32>,
    /// Winning restaurant ID, when the match produced one.
    pub result_restaurant_id: Option<String>,
    /// Whether the match ran to completion.
    pub completed: bool,
    /// Completion timestamp; cleared when a later report says incomplete.
    pub completed_at: Option<DateTime<Utc>>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `ad_impressions` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdImpressionRow {
    /// Row ID.
    pub id: Uuid,
    /// User who saw the ad; always attributed.
    pub user_id: String,
    /// Placement slot (e.g. `results_gate`).
    pub placement: String,
    /// Ad provider name.
    pub provider: Option<String>,
    /// Milliseconds the ad was watched.
    pub watched_ms: i64,
    /// Whether the ad played to completion.
    pub completed: bool,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `external_costs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCostRow {
    /// Row ID.
    pub id: Uuid,
    /// External service name (`tripadvisor`, `stripe`, ...).
    pub service: String,
    /// Billing unit (`per_request`, `flat_monthly`, ...).
    pub unit: String,
    /// Quantity of units consumed.
    pub quantity: Decimal,
    /// Cost per unit in USD.
    pub unit_cost: Decimal,
    /// Billing period start.
    pub period_start: NaiveDate,
    /// Billing period end.
    pub period_end: NaiveDate,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `revenue_entries` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenueRow {
    /// Row ID.
    pub id: Uuid,
    /// Paying user, when attributable.
    pub user_id: Option<String>,
    /// Revenue source (`stripe`, `ads`, ...).
    pub source: String,
    /// Plan name (`free`, `monthly`, `yearly`).
    pub plan: String,
    /// Gross amount in USD.
    pub amount_gross: Decimal,
    /// Fees in USD.
    pub fees: Decimal,
    /// Net amount in USD.
    pub amount_net: Decimal,
    /// Subscription period start.
    pub period_start: Option<NaiveDate>,
    /// Subscription period end.
    pub period_end: Option<NaiveDate>,
    /// External reference (e.g. a Stripe charge ID).
    pub external_ref: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `error_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogRow {
    /// Row ID.
    pub id: Uuid,
    /// User the error is attributed to, when known.
    pub user_id: Option<String>,
    /// Client session ID, when reported.
    pub session_id: Option<String>,
    /// Error category (`ValidationError`, `ServerError`, ...).
    pub error_type: String,
    /// Error message.
    pub error_message: String,
    /// Stack trace, when captured.
    pub stack_trace: Option<String>,
    /// Structured context captured with the error.
    pub context: Option<serde_json::Value>,
    /// Severity (`error`, `warning`, `critical`).
    pub severity: String,
    /// Reporting surface (`server`, `client`, `native-app`, `web`).
    pub source: String,
    /// Route the error occurred on.
    pub route: Option<String>,
    /// HTTP method, when applicable.
    pub method: Option<String>,
    /// HTTP status code, when applicable.
    pub status_code: Option<i32>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Whether the error has been triaged.
    pub resolved: bool,
    /// When it was resolved; cleared on unresolve.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who resolved it; cleared on unresolve.
    pub resolved_by: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `database_query_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogRow {
    /// Row ID.
    pub id: Uuid,
    /// Operation descriptor in `Model.action` form.
    pub query: String,
    /// Sanitized argument payload.
    pub params: Option<serde_json::Value>,
    /// Execution time in milliseconds.
    pub execution_time: i64,
    /// Logical entity name.
    pub model: Option<String>,
    /// Action name.
    pub operation: Option<String>,
    /// Caller the query is attributed to.
    pub user_id: Option<String>,
    /// Route the query ran under.
    pub route: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message for failed operations.
    pub error_message: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `performance_bottleneck_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckRow {
    /// Row ID.
    pub id: Uuid,
    /// Bottleneck kind (`slow_query`, `slow_endpoint`).
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub bottleneck_type: String,
    /// Severity (`warning`, `critical`).
    pub severity: String,
    /// Threshold in milliseconds that was exceeded.
    pub threshold: i64,
    /// Measured value in milliseconds.
    pub actual_value: i64,
    /// What was slow (`Model.action` or `METHOD /path`).
    pub resource: Option<String>,
    /// Structured details for the dashboard.
    pub details: Option<serde_json::Value>,
    /// Caller the bottleneck is attributed to.
    pub user_id: Option<String>,
    /// Whether the bottleneck has been triaged.
    pub resolved: bool,
    /// When it was resolved; cleared on unresolve.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who resolved it; cleared on unresolve.
    pub resolved_by: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `api_request_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequestLogRow {
    /// Row ID.
    pub id: Uuid,
    /// Request route (path and query).
    pub route: String,
    /// HTTP method.
    pub method: String,
    /// Response status code.
    pub status: i32,
    /// Latency in milliseconds.
    pub latency_ms: i64,
    /// Request body size in bytes.
    pub request_size: Option<i64>,
    /// Response body size in bytes.
    pub response_size: Option<i64>,
    /// Authenticated caller.
    pub user_id: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
