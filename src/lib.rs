//! # forkcast-metrics
//!
//! Telemetry and observability service for the Forkcast platform.
//!
//! This crate ingests product events, match outcomes, ad impressions, and
//! revenue/cost entries, observes its own database queries through a buffered
//! log pipeline, flags latency bottlenecks, and serves windowed aggregate
//! statistics. All persistence goes to PostgreSQL.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── Request middleware (telemetry/)
//!     │     caller resolution, request logging, failure capture
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── MetricsService (service/)
//!     ├── QueryObserver + QueryLogBuffer (telemetry/)
//!     │
//!     └── MetricsStore → PostgreSQL (store/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod telemetry;
