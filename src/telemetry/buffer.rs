//! Buffered batch writer for database query logs.
//!
//! Records accumulate in memory and are flushed to the sink either when the
//! buffer reaches `flush_size` or when `flush_interval` elapses after the
//! first record of a batch, whichever comes first. The flush swaps the
//! buffer contents out synchronously, so records enqueued while a write is
//! in flight land in the fresh buffer and are never lost or written twice.
//!
//! The sink writes through the raw store path, which the query observer
//! never wraps, so a flush cannot re-enqueue its own writes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::telemetry::record::QueryLogRecord;
use crate::telemetry::sink::TelemetrySink;

/// Tuning knobs for [`QueryLogBuffer`].
#[derive(Debug, Clone)]
pub struct BufferSettings {
    /// Master switch; a disabled buffer drops every record.
    pub enabled: bool,
    /// Buffered record count that triggers an immediate flush.
    pub flush_size: usize,
    /// Deadline for flushing a partially filled buffer.
    pub flush_interval: Duration,
    /// Hard cap on buffered records; the oldest is dropped beyond it.
    pub capacity: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_size: 50,
            flush_interval: Duration::from_millis(5000),
            capacity: 10_000,
        }
    }
}

/// Cheaply clonable handle to the single query-log buffer instance.
///
/// Created once at startup and shared by the observer, the HTTP state, and
/// the shutdown path. Explicitly not a global.
#[derive(Debug, Clone)]
pub struct QueryLogBuffer {
    inner: Arc<BufferInner>,
}

#[derive(Debug)]
struct BufferInner {
    records: Mutex<VecDeque<QueryLogRecord>>,
    flush_scheduled: AtomicBool,
    dropped: AtomicU64,
    settings: BufferSettings,
    sink: Arc<dyn TelemetrySink>,
}

impl BufferInner {
    /// A poisoned lock still holds a valid deque; recover the guard.
    fn lock_records(&self) -> std::sync::MutexGuard<'_, VecDeque<QueryLogRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl QueryLogBuffer {
    /// Creates a buffer writing to `sink`.
    #[must_use]
    pub fn new(settings: BufferSettings, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                records: Mutex::new(VecDeque::new()),
                flush_scheduled: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
                settings,
                sink,
            }),
        }
    }

    /// Appends a record and arranges for a flush.
    ///
    /// Never fails and never blocks beyond the buffer mutex. Reaching
    /// `flush_size` spawns an immediate flush; otherwise the first record
    /// of a batch arms a one-shot timer that flushes after
    /// `flush_interval`. At capacity the oldest record is dropped so the
    /// freshest evidence survives a store outage.
    pub fn enqueue(&self, record: QueryLogRecord) {
        if !self.inner.settings.enabled {
            return;
        }

        let mut dropped_oldest = false;
        let len = {
            let mut records = self.inner.lock_records();
            if records.len() >= self.inner.settings.capacity {
                records.pop_front();
                dropped_oldest = true;
            }
            records.push_back(record);
            records.len()
        };
        if dropped_oldest {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                capacity = self.inner.settings.capacity,
                "query log buffer full; dropped oldest record"
            );
        }

        if len >= self.inner.settings.flush_size {
            let buffer = self.clone();
            tokio::spawn(async move {
                buffer.flush().await;
            });
        } else if !self.inner.flush_scheduled.swap(true, Ordering::SeqCst) {
            let buffer = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(buffer.inner.settings.flush_interval).await;
                buffer.inner.flush_scheduled.store(false, Ordering::SeqCst);
                buffer.flush().await;
            });
        }
    }

    /// Drains the buffer and writes every drained record to the sink.
    ///
    /// The drain happens synchronously under the mutex; the writes run in
    /// parallel afterwards. A record whose write fails is dropped with a
    /// debug log and does not affect the others. Also called once on
    /// shutdown, before the pool closes.
    pub async fn flush(&self) {
        let drained: Vec<QueryLogRecord> = {
            let mut records = self.inner.lock_records();
            if records.is_empty() {
                return;
            }
            records.drain(..).collect()
        };

        tracing::debug!(count = drained.len(), "flushing query logs");
        let writes = drained.iter().map(|record| async move {
            if let Err(err) = self.inner.sink.write_query_log(record).await {
                tracing::debug!(error = %err, query = %record.query, "failed to persist query log");
            }
        });
        futures_util::future::join_all(writes).await;
    }

    /// Number of records currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock_records().len()
    }

    /// Whether the buffer is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock_records().is_empty()
    }

    /// Number of records dropped because the buffer was at capacity.
    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::TelemetryError;
    use crate::telemetry::record::BottleneckRecord;
    use async_trait::async_trait;

    #[derive(Debug, Default)]
    struct RecordingSink {
        written: Mutex<Vec<QueryLogRecord>>,
        fail_queries: Vec<String>,
        write_delay: Option<Duration>,
    }

    impl RecordingSink {
        fn written(&self) -> Vec<QueryLogRecord> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TelemetrySink for RecordingSink {
        async fn write_query_log(&self, record: &QueryLogRecord) -> Result<(), TelemetryError> {
            if let Some(delay) = self.write_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_queries.contains(&record.query) {
                return Err(TelemetryError::PersistenceError("sink down".into()));
            }
            self.written.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn write_bottleneck(&self, _record: &BottleneckRecord) -> Result<(), TelemetryError> {
            Ok(())
        }
    }

    fn record(query: &str) -> QueryLogRecord {
        QueryLogRecord {
            query: query.to_string(),
            params: None,
            execution_time_ms: 150,
            model: Some("Event".into()),
            operation: Some("create".into()),
            user_id: None,
            route: None,
            success: true,
            error_message: None,
        }
    }

    fn settings(flush_size: usize, interval_ms: u64) -> BufferSettings {
        BufferSettings {
            enabled: true,
            flush_size,
            flush_interval: Duration::from_millis(interval_ms),
            capacity: 10_000,
        }
    }

    async fn wait_for_writes(sink: &RecordingSink, expected: usize) {
        for _ in 0..200 {
            if sink.written.lock().unwrap().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "sink never reached {expected} writes (got {})",
            sink.written.lock().unwrap().len()
        );
    }

    #[tokio::test]
    async fn reaching_flush_size_triggers_an_immediate_flush() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = QueryLogBuffer::new(settings(3, 60_000), Arc::clone(&sink) as Arc<dyn TelemetrySink>);

        buffer.enqueue(record("Event.create"));
        buffer.enqueue(record("Event.create"));
        assert!(sink.written().is_empty());
        buffer.enqueue(record("Event.create"));

        wait_for_writes(&sink, 3).await;
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn a_lone_record_flushes_after_the_interval() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = QueryLogBuffer::new(settings(50, 50), Arc::clone(&sink) as Arc<dyn TelemetrySink>);

        buffer.enqueue(record("MatchStats.upsert"));
        // Well before the 50ms deadline nothing has been written.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sink.written().is_empty());
        assert_eq!(buffer.len(), 1);

        wait_for_writes(&sink, 1).await;
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn failed_writes_are_swallowed_per_record() {
        let sink = Arc::new(RecordingSink {
            fail_queries: vec!["ErrorLog.create".to_string()],
            ..RecordingSink::default()
        });
        let buffer = QueryLogBuffer::new(settings(50, 60_000), Arc::clone(&sink) as Arc<dyn TelemetrySink>);

        buffer.enqueue(record("Event.create"));
        buffer.enqueue(record("ErrorLog.create"));
        buffer.enqueue(record("AdImpression.create"));
        buffer.flush().await;

        let written = sink.written();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|r| r.query != "ErrorLog.create"));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn records_enqueued_during_a_slow_flush_are_not_lost() {
        let sink = Arc::new(RecordingSink {
            write_delay: Some(Duration::from_millis(50)),
            ..RecordingSink::default()
        });
        let buffer = QueryLogBuffer::new(settings(2, 60_000), Arc::clone(&sink) as Arc<dyn TelemetrySink>);

        buffer.enqueue(record("Event.create"));
        buffer.enqueue(record("Event.create"));
        // The flush of the first two is in flight; this one lands in the
        // fresh buffer.
        tokio::time::sleep(Duration::from_millis(10)).await;
        buffer.enqueue(record("Revenue.create"));
        assert_eq!(buffer.len(), 1);

        buffer.flush().await;
        wait_for_writes(&sink, 3).await;
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn capacity_drops_the_oldest_record() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = QueryLogBuffer::new(
            BufferSettings {
                enabled: true,
                flush_size: 100,
                flush_interval: Duration::from_secs(60),
                capacity: 2,
            },
            Arc::clone(&sink) as Arc<dyn TelemetrySink>,
        );

        buffer.enqueue(record("Event.first"));
        buffer.enqueue(record("Event.second"));
        buffer.enqueue(record("Event.third"));
        assert_eq!(buffer.dropped_records(), 1);

        buffer.flush().await;
        let queries: Vec<String> = sink.written().into_iter().map(|r| r.query).collect();
        assert_eq!(queries, vec!["Event.second", "Event.third"]);
    }

    #[tokio::test]
    async fn a_disabled_buffer_drops_everything() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = QueryLogBuffer::new(
            BufferSettings {
                enabled: false,
                ..BufferSettings::default()
            },
            Arc::clone(&sink) as Arc<dyn TelemetrySink>,
        );

        buffer.enqueue(record("Event.create"));
        buffer.flush().await;
        assert!(sink.written().is_empty());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn flushing_an_empty_buffer_is_a_no_op() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = QueryLogBuffer::new(settings(50, 60_000), Arc::clone(&sink) as Arc<dyn TelemetrySink>);
        buffer.flush().await;
        assert!(sink.written().is_empty());
    }
}
