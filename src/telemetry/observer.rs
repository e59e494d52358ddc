//! Timed observation wrapper around persistence operations.
//!
//! Every domain-facing store call goes through [`QueryObserver::observe`],
//! which measures wall-clock time, buffers a query log record for slow or
//! failed operations, and emits a `slow_query` bottleneck when the slow
//! threshold is crossed. The wrapped operation's outcome is returned
//! unchanged; observation cost on the caller is one synchronous enqueue.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::error::TelemetryError;
use crate::telemetry::context;
use crate::telemetry::detector::LatencyThresholds;
use crate::telemetry::record::{BottleneckRecord, QueryLogRecord};
use crate::telemetry::sanitize::sanitize_params;
use crate::telemetry::sink::TelemetrySink;
use crate::telemetry::QueryLogBuffer;

/// Entities written by the telemetry pipeline itself. Operations on these
/// pass through unobserved; logging them would recurse.
const UNOBSERVED_MODELS: &[&str] =
    &["DatabaseQueryLog", "PerformanceBottleneckLog", "ApiRequestLog"];

/// Observes persistence operations and feeds the telemetry pipeline.
#[derive(Debug, Clone)]
pub struct QueryObserver {
    buffer: QueryLogBuffer,
    sink: Arc<dyn TelemetrySink>,
    log_threshold_ms: i64,
    thresholds: LatencyThresholds,
}

impl QueryObserver {
    /// Creates an observer buffering into `buffer` and reporting slow-query
    /// bottlenecks to `sink`.
    ///
    /// `log_threshold_ms` is the minimum execution time for a successful
    /// operation to be buffered at all; `thresholds` classifies slow-query
    /// bottlenecks.
    #[must_use]
    pub fn new(
        buffer: QueryLogBuffer,
        sink: Arc<dyn TelemetrySink>,
        log_threshold_ms: i64,
        thresholds: LatencyThresholds,
    ) -> Self {
        Self {
            buffer,
            sink,
            log_threshold_ms,
            thresholds,
        }
    }

    /// Runs `op`, recording its timing under the `Model.action` descriptor.
    ///
    /// Successful operations faster than the log threshold leave no trace.
    /// Slower ones, and every failed one, are buffered with the sanitized
    /// `args` payload and the ambient request context. Crossing the slow
    /// threshold additionally emits a `slow_query` bottleneck as a spawned
    /// task whose failure is swallowed.
    ///
    /// # Errors
    ///
    /// Returns exactly the error `op` resolved to; observation itself never
    /// fails the operation.
    pub async fn observe<T, F>(
        &self,
        model: &str,
        action: &str,
        args: Option<Value>,
        op: F,
    ) -> Result<T, TelemetryError>
    where
        F: Future<Output = Result<T, TelemetryError>>,
    {
        if UNOBSERVED_MODELS.contains(&model) {
            return op.await;
        }

        let started = Instant::now();
        let result = op.await;
        let elapsed_ms = elapsed_millis(&started);
        let success = result.is_ok();
        let ctx = context::current().unwrap_or_default();

        if elapsed_ms >= self.log_threshold_ms || !success {
            self.buffer.enqueue(QueryLogRecord {
                query: format!("{model}.{action}"),
                params: args.as_ref().map(sanitize_params),
                execution_time_ms: elapsed_ms,
                model: Some(model.to_string()),
                operation: Some(action.to_string()),
                user_id: ctx.user_id.clone(),
                route: ctx.route.clone(),
                success,
                error_message: result.as_ref().err().map(ToString::to_string),
            });
        }

        if let Some(severity) = self.thresholds.classify(elapsed_ms) {
            let record = BottleneckRecord {
                bottleneck_type: "slow_query".to_string(),
                severity,
                threshold: self.thresholds.slow,
                actual_value: elapsed_ms,
                resource: Some(format!("{model}.{action}")),
                details: Some(serde_json::json!({
                    "model": model,
                    "operation": action,
                    "query": format!("{model}.{action}"),
                })),
                user_id: ctx.user_id,
            };
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                if let Err(err) = sink.write_bottleneck(&record).await {
                    tracing::debug!(error = %err, "failed to persist slow query bottleneck");
                }
            });
        }

        result
    }
}

/// Milliseconds elapsed since `started`, saturating on overflow.
fn elapsed_millis(started: &Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::telemetry::buffer::BufferSettings;
    use crate::telemetry::context::RequestContext;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct TestSink {
        query_logs: Mutex<Vec<QueryLogRecord>>,
        bottlenecks: Mutex<Vec<BottleneckRecord>>,
    }

    #[async_trait]
    impl TelemetrySink for TestSink {
        async fn write_query_log(&self, record: &QueryLogRecord) -> Result<(), TelemetryError> {
            self.query_logs.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn write_bottleneck(&self, record: &BottleneckRecord) -> Result<(), TelemetryError> {
            self.bottlenecks.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn observer_with(
        log_threshold_ms: i64,
        thresholds: LatencyThresholds,
    ) -> (QueryObserver, Arc<TestSink>, QueryLogBuffer) {
        let sink = Arc::new(TestSink::default());
        let buffer = QueryLogBuffer::new(
            BufferSettings {
                enabled: true,
                flush_size: 1000,
                flush_interval: Duration::from_secs(60),
                capacity: 10_000,
            },
            Arc::clone(&sink) as Arc<dyn TelemetrySink>,
        );
        let observer = QueryObserver::new(
            buffer.clone(),
            Arc::clone(&sink) as Arc<dyn TelemetrySink>,
            log_threshold_ms,
            thresholds,
        );
        (observer, sink, buffer)
    }

    async fn wait_for_bottlenecks(sink: &TestSink, expected: usize) {
        for _ in 0..200 {
            if sink.bottlenecks.lock().unwrap().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("bottleneck never arrived");
    }

    #[tokio::test]
    async fn fast_success_leaves_no_trace() {
        let (observer, sink, buffer) = observer_with(100, LatencyThresholds::new(500, 2000));
        let result = observer
            .observe("Event", "create", None, async { Ok(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert!(buffer.is_empty());
        assert!(sink.bottlenecks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_success_is_buffered() {
        let (observer, sink, buffer) = observer_with(20, LatencyThresholds::new(500, 2000));
        let result = observer
            .observe(
                "Event",
                "create",
                Some(serde_json::json!({"sessionId": "s-1", "token": "tk"})),
                async {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Ok(1)
                },
            )
            .await;
        assert!(result.is_ok());

        buffer.flush().await;
        let logs = sink.query_logs.lock().unwrap().clone();
        assert_eq!(logs.len(), 1);
        let Some(log) = logs.first() else {
            panic!("expected one query log");
        };
        assert_eq!(log.query, "Event.create");
        assert!(log.success);
        assert!(log.execution_time_ms >= 20);
        // Sensitive argument values are redacted before buffering.
        assert_eq!(
            log.params,
            Some(serde_json::json!({"sessionId": "s-1", "token": "[REDACTED]"}))
        );
    }

    #[tokio::test]
    async fn failures_are_buffered_regardless_of_speed() {
        let (observer, sink, buffer) = observer_with(1000, LatencyThresholds::new(500, 2000));
        let result: Result<i32, TelemetryError> = observer
            .observe("MatchStats", "upsert", None, async {
                Err(TelemetryError::PersistenceError("pool closed".into()))
            })
            .await;
        assert!(matches!(result, Err(TelemetryError::PersistenceError(_))));

        buffer.flush().await;
        let logs = sink.query_logs.lock().unwrap().clone();
        assert_eq!(logs.len(), 1);
        let Some(log) = logs.first() else {
            panic!("expected one query log");
        };
        assert!(!log.success);
        assert_eq!(
            log.error_message.as_deref(),
            Some("persistence error: pool closed")
        );
    }

    #[tokio::test]
    async fn crossing_the_slow_threshold_emits_a_bottleneck() {
        let (observer, sink, _buffer) = observer_with(5, LatencyThresholds::new(20, 2000));
        let result = observer
            .observe("Event", "findMany", None, async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(())
            })
            .await;
        assert!(result.is_ok());

        wait_for_bottlenecks(&sink, 1).await;
        let bottlenecks = sink.bottlenecks.lock().unwrap().clone();
        let Some(bottleneck) = bottlenecks.first() else {
            panic!("expected one bottleneck");
        };
        assert_eq!(bottleneck.bottleneck_type, "slow_query");
        assert_eq!(bottleneck.threshold, 20);
        assert_eq!(bottleneck.resource.as_deref(), Some("Event.findMany"));
    }

    #[tokio::test]
    async fn telemetry_entities_pass_through_unobserved() {
        let (observer, sink, buffer) = observer_with(0, LatencyThresholds::new(0, 1));
        let result = observer
            .observe("DatabaseQueryLog", "create", None, async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            })
            .await;
        assert!(result.is_ok());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(buffer.is_empty());
        assert!(sink.bottlenecks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_carry_the_request_context() {
        let (observer, sink, buffer) = observer_with(0, LatencyThresholds::new(500, 2000));
        context::scope(
            RequestContext {
                user_id: Some("u-7".into()),
                route: Some("/metrics/events".into()),
            },
            async {
                let _ = observer
                    .observe("Event", "create", None, async { Ok(()) })
                    .await;
            },
        )
        .await;

        buffer.flush().await;
        let logs = sink.query_logs.lock().unwrap().clone();
        let Some(log) = logs.first() else {
            panic!("expected one query log");
        };
        assert_eq!(log.user_id.as_deref(), Some("u-7"));
        assert_eq!(log.route.as_deref(), Some("/metrics/events"));
    }
}
