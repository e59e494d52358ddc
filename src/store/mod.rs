//! Persistence layer: PostgreSQL storage for the telemetry entities.
//!
//! [`MetricsStore`] is the single write/read surface over `sqlx::PgPool`.
//! It also implements [`TelemetrySink`](crate::telemetry::sink::TelemetrySink)
//! so the query-log buffer and the observer can write through it without
//! their writes being observed in turn.

pub mod models;
pub mod postgres;

pub use postgres::MetricsStore;
