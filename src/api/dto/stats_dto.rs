//! Query parameters for the aggregate stats endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

/// Window parameter shared by the stats endpoints.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsWindowQuery {
    /// Aggregation window in days; each endpoint has its own default.
    #[serde(default)]
    pub days: Option<i64>,
}

impl StatsWindowQuery {
    /// Window width, falling back to the endpoint default.
    #[must_use]
    pub fn days_or(self, default_days: i64) -> i64 {
        self.days.unwrap_or(default_days).max(1)
    }
}

/// Query parameters for `GET /metrics/stats/events`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventStatsQuery {
    /// Restrict the count to one event type.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Aggregation window in days. Defaults to 7.
    #[serde(default)]
    pub days: Option<i64>,
}
