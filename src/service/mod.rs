//! Service layer: business logic orchestration.
//!
//! [`MetricsService`] coordinates ingestion, reads, and aggregates,
//! routing every domain-facing store call through the
//! [`crate::telemetry::QueryObserver`].

pub mod metrics_service;

pub use metrics_service::{IngestSummary, MetricsService};
