//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::TelemetryConfig;
use crate::service::MetricsService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metrics service for all ingestion, reads, and aggregates.
    pub metrics: Arc<MetricsService>,
    /// Runtime configuration (thresholds, retention, environment).
    pub config: Arc<TelemetryConfig>,
}
