//! Telemetry core: query observation, buffering, request logging, and
//! failure capture.
//!
//! The pipeline has two halves. The data side wraps persistence operations
//! ([`observer`]) and batches their logs through the [`buffer`] into the
//! sink. The HTTP side wraps every request ([`request_logger`]) and every
//! error response ([`failure`]), attributing both through the task-scoped
//! request [`context`].

pub mod buffer;
pub mod context;
pub mod detector;
pub mod failure;
pub mod observer;
pub mod record;
pub mod request_logger;
pub mod sanitize;
pub mod sink;

pub use buffer::{BufferSettings, QueryLogBuffer};
pub use detector::{BottleneckSeverity, LatencyThresholds};
pub use observer::QueryObserver;
