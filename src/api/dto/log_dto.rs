//! Query log and bottleneck DTOs: filtered reads and resolution.

use chrono::{Duration, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::store::models::{BottleneckFilter, QueryLogFilter};

/// Query parameters for `GET /metrics/database-queries`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct QueryLogListQuery {
    /// Filter by logical entity name.
    #[serde(default)]
    pub model: Option<String>,
    /// Filter by action name (`create`, `findMany`, ...).
    #[serde(default)]
    pub operation: Option<String>,
    /// Keep only queries at least this slow, in milliseconds.
    #[serde(default)]
    pub min_execution_time: Option<i64>,
    /// Filter by attributed user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Filter by originating route.
    #[serde(default)]
    pub route: Option<String>,
    /// Filter by success flag.
    #[serde(default)]
    pub success: Option<bool>,
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

impl QueryLogListQuery {
    /// Converts into a store filter, applying the retention default when
    /// no explicit window was requested.
    #[must_use]
    pub fn into_filter(self, default_days: i64) -> QueryLogFilter {
        QueryLogFilter {
            since: Utc::now() - Duration::days(self.days.unwrap_or(default_days)),
            model: self.model,
            operation: self.operation,
            min_execution_time: self.min_execution_time,
            user_id: self.user_id,
            route: self.route,
            success: self.success,
            limit: self.limit.unwrap_or(100).clamp(1, 1000),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// Query parameters for `GET /metrics/performance-bottlenecks`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BottleneckListQuery {
    /// Filter by bottleneck kind (`slow_query`, `slow_endpoint`).
    #[serde(default, rename = "type")]
    pub bottleneck_type: Option<String>,
    /// Filter by severity (`warning`, `critical`).
    #[serde(default)]
    pub severity: Option<String>,
    /// Filter by resolution state.
    #[serde(default)]
    pub resolved: Option<bool>,
    /// Filter by the slow resource descriptor.
    #[serde(default)]
    pub resource: Option<String>,
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

impl BottleneckListQuery {
    /// Converts into a store filter, applying the retention default when
    /// no explicit window was requested.
    #[must_use]
    pub fn into_filter(self, default_days: i64) -> BottleneckFilter {
        BottleneckFilter {
            since: Utc::now() - Duration::days(self.days.unwrap_or(default_days)),
            bottleneck_type: self.bottleneck_type,
            severity: self.severity,
            resolved: self.resolved,
            resource: self.resource,
            limit: self.limit.unwrap_or(100).clamp(1, 1000),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// Request body for `PATCH /metrics/performance-bottlenecks/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBottleneckRequest {
    /// Resolution state to transition to.
    pub resolved: bool,
    /// User who resolved the bottleneck.
    #[serde(default)]
    pub resolved_by: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bottleneck_kind_uses_the_type_parameter() {
        let query: BottleneckListQuery =
            serde_json::from_value(json!({ "type": "slow_query", "resolved": false })).unwrap();
        let filter = query.into_filter(30);

        assert_eq!(filter.bottleneck_type.as_deref(), Some("slow_query"));
        assert_eq!(filter.resolved, Some(false));
    }

    #[test]
    fn query_log_filter_defaults_to_retention_window() {
        let query: QueryLogListQuery = serde_json::from_value(json!({})).unwrap();
        let filter = query.into_filter(30);

        assert_eq!((Utc::now() - filter.since).num_days(), 30);
        assert_eq!(filter.limit, 100);
        assert!(filter.min_execution_time.is_none());
    }
}
