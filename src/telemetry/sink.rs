//! Write target for telemetry records.
//!
//! The buffer and observer write through this seam rather than the store
//! type directly. Production wires it to [`MetricsStore`]; unit tests drive
//! the pipeline with recording sinks. Implementations must write through
//! the raw store path so telemetry writes are never themselves observed.
//!
//! [`MetricsStore`]: crate::store::MetricsStore

use async_trait::async_trait;

use crate::error::TelemetryError;
use crate::telemetry::record::{BottleneckRecord, QueryLogRecord};

/// Destination for query-log and bottleneck records.
#[async_trait]
pub trait TelemetrySink: Send + Sync + std::fmt::Debug {
    /// Persists one query log record.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails; callers swallow it.
    async fn write_query_log(&self, record: &QueryLogRecord) -> Result<(), TelemetryError>;

    /// Persists one bottleneck record.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails; callers swallow it.
    async fn write_bottleneck(&self, record: &BottleneckRecord) -> Result<(), TelemetryError>;
}
