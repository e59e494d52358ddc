//! PostgreSQL store for the telemetry entities.
//!
//! Every method here is the raw write/read path: nothing below this layer
//! goes through the query observer again, which is what keeps the telemetry
//! pipeline from observing its own writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    AdImpressionRow, BottleneckFilter, BottleneckRow, ErrorLogFilter, ErrorLogRow, EventRow,
    ExternalCostRow, MatchStatsRow, NewAdImpression, NewErrorLog, NewEvent, NewExternalCost,
    NewMatchStats, NewRevenue, QueryLogFilter, QueryLogRow, RevenueRow,
};
use crate::error::TelemetryError;
use crate::telemetry::record::{ApiRequestRecord, BottleneckRecord, QueryLogRecord};
use crate::telemetry::sink::TelemetrySink;

/// PostgreSQL-backed telemetry store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    pool: PgPool,
}

impl MetricsStore {
    /// Creates a new store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Inserts an analytics event.
    ///
    /// When the event carries an `idempotency_key` the insert is
    /// insert-or-return-existing: a key already present (including one
    /// inserted by a concurrent request between the lookup and the insert)
    /// yields the existing row instead of a second one.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_event(&self, event: &NewEvent) -> Result<EventRow, TelemetryError> {
        let Some(key) = &event.idempotency_key else {
            return sqlx::query_as::<_, EventRow>(
                "INSERT INTO events (id, user_id, session_id, event_type, properties, source, idempotency_key) \
                 VALUES ($1, $2, $3, $4, $5, $6, NULL) RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(&event.user_id)
            .bind(&event.session_id)
            .bind(&event.event_type)
            .bind(&event.properties)
            .bind(&event.source)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()));
        };

        if let Some(existing) = self.find_event_by_key(key).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, EventRow>(
            "INSERT INTO events (id, user_id, session_id, event_type, properties, source, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (idempotency_key) DO NOTHING RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(&event.event_type)
        .bind(&event.properties)
        .bind(&event.source)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        match inserted {
            Some(row) => Ok(row),
            // A concurrent insert with the same key won the race.
            None => {
                tracing::debug!(idempotency_key = %key, "skipped duplicate event");
                sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE idempotency_key = $1")
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
            }
        }
    }

    async fn find_event_by_key(&self, key: &str) -> Result<Option<EventRow>, TelemetryError> {
        sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    // ── Match stats ─────────────────────────────────────────────────────

    /// Inserts or fully replaces the stats row for a match.
    ///
    /// The upsert is keyed on `match_id`; a second report for the same match
    /// replaces every mutable field. `completed_at` is set to now when the
    /// report says completed and cleared otherwise, on both paths.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn upsert_match_stats(
        &self,
        stats: &NewMatchStats,
    ) -> Result<MatchStatsRow, TelemetryError> {
        sqlx::query_as::<_, MatchStatsRow>(
            "INSERT INTO match_stats (id, match_id, mode, vote_rule, participants, cards_presented, \
             cards_liked, time_to_decision_seconds, result_restaurant_id, completed, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (match_id) DO UPDATE SET \
             mode = EXCLUDED.mode, vote_rule = EXCLUDED.vote_rule, \
             participants = EXCLUDED.participants, cards_presented = EXCLUDED.cards_presented, \
             cards_liked = EXCLUDED.cards_liked, \
             time_to_decision_seconds = EXCLUDED.time_to_decision_seconds, \
             result_restaurant_id = EXCLUDED.result_restaurant_id, \
             completed = EXCLUDED.completed, completed_at = EXCLUDED.completed_at \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&stats.match_id)
        .bind(&stats.mode)
        .bind(&stats.vote_rule)
        .bind(stats.participants)
        .bind(stats.cards_presented)
        .bind(stats.cards_liked)
        .bind(stats.time_to_decision_seconds)
        .bind(&stats.result_restaurant_id)
        .bind(stats.completed)
        .bind(completion_timestamp(stats.completed))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    // ── Ad impressions ──────────────────────────────────────────────────

    /// Inserts an ad impression.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_ad_impression(
        &self,
        ad: &NewAdImpression,
    ) -> Result<AdImpressionRow, TelemetryError> {
        sqlx::query_as::<_, AdImpressionRow>(
            "INSERT INTO ad_impressions (id, user_id, placement, provider, watched_ms, completed) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&ad.user_id)
        .bind(&ad.placement)
        .bind(&ad.provider)
        .bind(ad.watched_ms)
        .bind(ad.completed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    // ── Costs and revenue ───────────────────────────────────────────────

    /// Inserts an external cost entry.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_cost(
        &self,
        cost: &NewExternalCost,
    ) -> Result<ExternalCostRow, TelemetryError> {
        sqlx::query_as::<_, ExternalCostRow>(
            "INSERT INTO external_costs (id, service, unit, quantity, unit_cost, period_start, \
             period_end, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&cost.service)
        .bind(&cost.unit)
        .bind(cost.quantity)
        .bind(cost.unit_cost)
        .bind(cost.period_start)
        .bind(cost.period_end)
        .bind(&cost.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Inserts a revenue entry.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_revenue(&self, revenue: &NewRevenue) -> Result<RevenueRow, TelemetryError> {
        sqlx::query_as::<_, RevenueRow>(
            "INSERT INTO revenue_entries (id, user_id, source, plan, amount_gross, fees, \
             amount_net, period_start, period_end, external_ref) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&revenue.user_id)
        .bind(&revenue.source)
        .bind(&revenue.plan)
        .bind(revenue.amount_gross)
        .bind(revenue.fees)
        .bind(revenue.amount_net)
        .bind(revenue.period_start)
        .bind(revenue.period_end)
        .bind(&revenue.external_ref)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    // ── Error logs ──────────────────────────────────────────────────────

    /// Inserts an error log.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_error_log(&self, log: &NewErrorLog) -> Result<ErrorLogRow, TelemetryError> {
        sqlx::query_as::<_, ErrorLogRow>(
            "INSERT INTO error_logs (id, user_id, session_id, error_type, error_message, \
             stack_trace, context, severity, source, route, method, status_code, user_agent, \
             ip_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&log.user_id)
        .bind(&log.session_id)
        .bind(&log.error_type)
        .bind(&log.error_message)
        .bind(&log.stack_trace)
        .bind(&log.context)
        .bind(&log.severity)
        .bind(&log.source)
        .bind(&log.route)
        .bind(&log.method)
        .bind(log.status_code)
        .bind(&log.user_agent)
        .bind(&log.ip_address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Updates the resolution state of an error log.
    ///
    /// Resolving sets `resolved_at` to now and `resolved_by` when provided;
    /// unresolving clears both; `resolved_by` alone updates just that field.
    /// Returns `None` when no row has the given ID.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn update_error_log(
        &self,
        id: Uuid,
        resolved: Option<bool>,
        resolved_by: Option<&str>,
    ) -> Result<Option<ErrorLogRow>, TelemetryError> {
        if resolved.is_none() && resolved_by.is_none() {
            return sqlx::query_as::<_, ErrorLogRow>("SELECT * FROM error_logs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| TelemetryError::PersistenceError(e.to_string()));
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE error_logs SET ");
        push_resolution_update(&mut query, resolved, resolved_by);
        query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        query
            .build_query_as::<ErrorLogRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Lists error logs matching the filter plus the unpaginated total.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn list_error_logs(
        &self,
        filter: &ErrorLogFilter,
    ) -> Result<(Vec<ErrorLogRow>, i64), TelemetryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM error_logs");
        push_error_log_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM error_logs");
        push_error_log_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let records = query
            .build_query_as::<ErrorLogRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok((records, total))
    }

    // ── Query logs ──────────────────────────────────────────────────────

    /// Lists database query logs matching the filter plus the unpaginated
    /// total.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn list_query_logs(
        &self,
        filter: &QueryLogFilter,
    ) -> Result<(Vec<QueryLogRow>, i64), TelemetryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM database_query_logs");
        push_query_log_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM database_query_logs");
        push_query_log_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let records = query
            .build_query_as::<QueryLogRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok((records, total))
    }

    /// Inserts one query log record. Raw path used by the buffer flush.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_query_log(&self, record: &QueryLogRecord) -> Result<(), TelemetryError> {
        sqlx::query(
            "INSERT INTO database_query_logs (id, query, params, execution_time, model, \
             operation, user_id, route, success, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(&record.query)
        .bind(&record.params)
        .bind(record.execution_time_ms)
        .bind(&record.model)
        .bind(&record.operation)
        .bind(&record.user_id)
        .bind(&record.route)
        .bind(record.success)
        .bind(&record.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    // ── Bottlenecks ─────────────────────────────────────────────────────

    /// Lists performance bottlenecks matching the filter plus the
    /// unpaginated total.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn list_bottlenecks(
        &self,
        filter: &BottleneckFilter,
    ) -> Result<(Vec<BottleneckRow>, i64), TelemetryError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM performance_bottleneck_logs");
        push_bottleneck_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        let mut query =
            QueryBuilder::<Postgres>::new("SELECT * FROM performance_bottleneck_logs");
        push_bottleneck_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let records = query
            .build_query_as::<BottleneckRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok((records, total))
    }

    /// Updates the resolution state of a performance bottleneck.
    ///
    /// Same transition rules as error logs: resolving stamps
    /// `resolved_at`/`resolved_by`, unresolving clears both. Returns `None`
    /// when no row has the given ID.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn update_bottleneck(
        &self,
        id: Uuid,
        resolved: bool,
        resolved_by: Option<&str>,
    ) -> Result<Option<BottleneckRow>, TelemetryError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE performance_bottleneck_logs SET ");
        push_resolution_update(&mut query, Some(resolved), resolved_by);
        query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        query
            .build_query_as::<BottleneckRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Inserts one bottleneck record. Raw path used by the observer and the
    /// request middleware.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_bottleneck(&self, record: &BottleneckRecord) -> Result<(), TelemetryError> {
        sqlx::query(
            "INSERT INTO performance_bottleneck_logs (id, type, severity, threshold, \
             actual_value, resource, details, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4())
        .bind(&record.bottleneck_type)
        .bind(record.severity.as_str())
        .bind(record.threshold)
        .bind(record.actual_value)
        .bind(&record.resource)
        .bind(&record.details)
        .bind(&record.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    // ── API request logs ────────────────────────────────────────────────

    /// Inserts one API request log record. Raw path used by the request
    /// middleware.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn insert_api_request(
        &self,
        record: &ApiRequestRecord,
    ) -> Result<(), TelemetryError> {
        sqlx::query(
            "INSERT INTO api_request_logs (id, route, method, status, latency_ms, request_size, \
             response_size, user_id, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(&record.route)
        .bind(&record.method)
        .bind(record.status)
        .bind(record.latency_ms)
        .bind(record.request_size)
        .bind(record.response_size)
        .bind(&record.user_id)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    // ── Aggregates ──────────────────────────────────────────────────────

    /// Event count and distinct attributed users since the cutoff,
    /// optionally for a single event type.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn event_stats(
        &self,
        event_type: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<(i64, i64), TelemetryError> {
        let row = if let Some(event_type) = event_type {
            sqlx::query_as::<_, (i64, i64)>(
                "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM events \
                 WHERE created_at >= $1 AND event_type = $2",
            )
            .bind(since)
            .bind(event_type)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, (i64, i64)>(
                "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM events WHERE created_at >= $1",
            )
            .bind(since)
            .fetch_one(&self.pool)
            .await
        }
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Match totals and averages since the cutoff: total, completed count,
    /// then average participants, cards presented, cards liked, and time to
    /// decision (null on an empty window).
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    #[allow(clippy::type_complexity)]
    pub async fn match_aggregates(
        &self,
        since: DateTime<Utc>,
    ) -> Result<(i64, i64, Option<f64>, Option<f64>, Option<f64>, Option<f64>), TelemetryError>
    {
        sqlx::query_as::<_, (i64, i64, Option<f64>, Option<f64>, Option<f64>, Option<f64>)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE completed), \
             AVG(participants)::float8, AVG(cards_presented)::float8, \
             AVG(cards_liked)::float8, AVG(time_to_decision_seconds)::float8 \
             FROM match_stats WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Ad impression totals since the cutoff: total, completed count,
    /// average watch time in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn ad_aggregates(
        &self,
        since: DateTime<Utc>,
    ) -> Result<(i64, i64, Option<f64>), TelemetryError> {
        sqlx::query_as::<_, (i64, i64, Option<f64>)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE completed), AVG(watched_ms)::float8 \
             FROM ad_impressions WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Gross, fees, and net revenue sums over entries created since the
    /// cutoff.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn revenue_sums(
        &self,
        since: DateTime<Utc>,
    ) -> Result<(Decimal, Decimal, Decimal), TelemetryError> {
        sqlx::query_as::<_, (Decimal, Decimal, Decimal)>(
            "SELECT COALESCE(SUM(amount_gross), 0), COALESCE(SUM(fees), 0), \
             COALESCE(SUM(amount_net), 0) FROM revenue_entries WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Total external cost (`quantity * unit_cost`) over cost entries whose
    /// billing period starts on or after the cutoff date.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn total_cost(&self, since: NaiveDate) -> Result<Decimal, TelemetryError> {
        sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(quantity * unit_cost), 0) FROM external_costs \
             WHERE period_start >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Error log total and unresolved count since the cutoff.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn error_totals(&self, since: DateTime<Utc>) -> Result<(i64, i64), TelemetryError> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT resolved) FROM error_logs \
             WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Error counts grouped by severity since the cutoff.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn error_counts_by_severity(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, TelemetryError> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT severity, COUNT(*) FROM error_logs WHERE created_at >= $1 GROUP BY severity",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Top error types by count since the cutoff, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn top_error_types(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(String, i64)>, TelemetryError> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT error_type, COUNT(*) AS count FROM error_logs WHERE created_at >= $1 \
             GROUP BY error_type ORDER BY count DESC LIMIT $2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// API request aggregates since the cutoff: total, avg/max/min latency,
    /// avg request and response sizes, and the count at or above the slow
    /// threshold.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    #[allow(clippy::type_complexity)]
    pub async fn api_request_aggregates(
        &self,
        since: DateTime<Utc>,
        slow_threshold_ms: i64,
    ) -> Result<
        (i64, Option<f64>, Option<i64>, Option<i64>, Option<f64>, Option<f64>, i64),
        TelemetryError,
    > {
        sqlx::query_as::<_, (i64, Option<f64>, Option<i64>, Option<i64>, Option<f64>, Option<f64>, i64)>(
            "SELECT COUNT(*), AVG(latency_ms)::float8, MAX(latency_ms), MIN(latency_ms), \
             AVG(request_size)::float8, AVG(response_size)::float8, \
             COUNT(*) FILTER (WHERE latency_ms >= $2) \
             FROM api_request_logs WHERE created_at >= $1",
        )
        .bind(since)
        .bind(slow_threshold_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Database query aggregates since the cutoff: total, avg/max/min
    /// execution time, the count at or above the slow threshold, and the
    /// failed count.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    #[allow(clippy::type_complexity)]
    pub async fn query_log_aggregates(
        &self,
        since: DateTime<Utc>,
        slow_threshold_ms: i64,
    ) -> Result<(i64, Option<f64>, Option<i64>, Option<i64>, i64, i64), TelemetryError> {
        sqlx::query_as::<_, (i64, Option<f64>, Option<i64>, Option<i64>, i64, i64)>(
            "SELECT COUNT(*), AVG(execution_time)::float8, MAX(execution_time), \
             MIN(execution_time), COUNT(*) FILTER (WHERE execution_time >= $2), \
             COUNT(*) FILTER (WHERE NOT success) \
             FROM database_query_logs WHERE created_at >= $1",
        )
        .bind(since)
        .bind(slow_threshold_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }

    /// Bottleneck counts grouped by type and severity since the cutoff.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError::PersistenceError`] on database failure.
    pub async fn bottleneck_counts(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, String, i64)>, TelemetryError> {
        sqlx::query_as::<_, (String, String, i64)>(
            "SELECT type, severity, COUNT(*) FROM performance_bottleneck_logs \
             WHERE created_at >= $1 GROUP BY type, severity",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TelemetryError::PersistenceError(e.to_string()))
    }
}

#[async_trait]
impl TelemetrySink for MetricsStore {
    async fn write_query_log(&self, record: &QueryLogRecord) -> Result<(), TelemetryError> {
        self.insert_query_log(record).await
    }

    async fn write_bottleneck(&self, record: &BottleneckRecord) -> Result<(), TelemetryError> {
        self.insert_bottleneck(record).await
    }
}

/// `completed_at` for a match report: stamped on completion, cleared
/// otherwise.
fn completion_timestamp(completed: bool) -> Option<DateTime<Utc>> {
    completed.then(Utc::now)
}

/// Pushes the SET clause for a resolution-state update. Resolving stamps
/// `resolved_at` and keeps an existing `resolved_by` unless the update
/// carries one; unresolving clears both fields, an explicit `resolved_by`
/// surviving the clear. `resolved_by` alone updates only that field.
fn push_resolution_update(
    builder: &mut QueryBuilder<'_, Postgres>,
    resolved: Option<bool>,
    resolved_by: Option<&str>,
) {
    let resolved_by = resolved_by.map(ToString::to_string);
    match resolved {
        Some(true) => {
            builder.push("resolved = TRUE, resolved_at = NOW(), resolved_by = COALESCE(");
            builder.push_bind(resolved_by);
            builder.push(", resolved_by)");
        }
        Some(false) => {
            builder.push("resolved = FALSE, resolved_at = NULL, resolved_by = ");
            builder.push_bind(resolved_by);
        }
        None => {
            builder.push("resolved_by = ");
            builder.push_bind(resolved_by);
        }
    }
}

fn push_error_log_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ErrorLogFilter) {
    builder.push(" WHERE created_at >= ").push_bind(filter.since);
    if let Some(severity) = &filter.severity {
        builder.push(" AND severity = ").push_bind(severity.clone());
    }
    if let Some(error_type) = &filter.error_type {
        builder.push(" AND error_type = ").push_bind(error_type.clone());
    }
    if let Some(resolved) = filter.resolved {
        builder.push(" AND resolved = ").push_bind(resolved);
    }
    if let Some(source) = &filter.source {
        builder.push(" AND source = ").push_bind(source.clone());
    }
    if let Some(user_id) = &filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
}

fn push_query_log_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &QueryLogFilter) {
    builder.push(" WHERE created_at >= ").push_bind(filter.since);
    if let Some(model) = &filter.model {
        builder.push(" AND model = ").push_bind(model.clone());
    }
    if let Some(operation) = &filter.operation {
        builder.push(" AND operation = ").push_bind(operation.clone());
    }
    if let Some(min_execution_time) = filter.min_execution_time {
        builder
            .push(" AND execution_time >= ")
            .push_bind(min_execution_time);
    }
    if let Some(user_id) = &filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(route) = &filter.route {
        builder.push(" AND route = ").push_bind(route.clone());
    }
    if let Some(success) = filter.success {
        builder.push(" AND success = ").push_bind(success);
    }
}

fn push_bottleneck_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &BottleneckFilter) {
    builder.push(" WHERE created_at >= ").push_bind(filter.since);
    if let Some(kind) = &filter.bottleneck_type {
        builder.push(" AND type = ").push_bind(kind.clone());
    }
    if let Some(severity) = &filter.severity {
        builder.push(" AND severity = ").push_bind(severity.clone());
    }
    if let Some(resolved) = filter.resolved {
        builder.push(" AND resolved = ").push_bind(resolved);
    }
    if let Some(resource) = &filter.resource {
        builder.push(" AND resource = ").push_bind(resource.clone());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn empty_query_log_filter() -> QueryLogFilter {
        QueryLogFilter {
            since: Utc::now(),
            model: None,
            operation: None,
            min_execution_time: None,
            user_id: None,
            route: None,
            success: None,
            limit: 100,
            offset: 0,
        }
    }

    #[test]
    fn completion_timestamp_follows_completed_flag() {
        assert!(completion_timestamp(true).is_some());
        assert!(completion_timestamp(false).is_none());
    }

    #[test]
    fn query_log_filters_only_push_present_fields() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM database_query_logs");
        push_query_log_filters(&mut builder, &empty_query_log_filter());
        assert_eq!(
            builder.sql(),
            "SELECT * FROM database_query_logs WHERE created_at >= $1"
        );

        let filter = QueryLogFilter {
            model: Some("Event".to_string()),
            success: Some(false),
            min_execution_time: Some(250),
            ..empty_query_log_filter()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM database_query_logs");
        push_query_log_filters(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM database_query_logs WHERE created_at >= $1 AND model = $2 \
             AND execution_time >= $3 AND success = $4"
        );
    }

    #[test]
    fn resolving_stamps_and_unresolving_clears() {
        let mut resolve = QueryBuilder::<Postgres>::new("UPDATE error_logs SET ");
        push_resolution_update(&mut resolve, Some(true), Some("admin"));
        assert_eq!(
            resolve.sql(),
            "UPDATE error_logs SET resolved = TRUE, resolved_at = NOW(), \
             resolved_by = COALESCE($1, resolved_by)"
        );

        let mut unresolve = QueryBuilder::<Postgres>::new("UPDATE error_logs SET ");
        push_resolution_update(&mut unresolve, Some(false), None);
        assert_eq!(
            unresolve.sql(),
            "UPDATE error_logs SET resolved = FALSE, resolved_at = NULL, resolved_by = $1"
        );

        let mut attribute = QueryBuilder::<Postgres>::new("UPDATE error_logs SET ");
        push_resolution_update(&mut attribute, None, Some("admin"));
        assert_eq!(attribute.sql(), "UPDATE error_logs SET resolved_by = $1");
    }

    #[test]
    fn bottleneck_filter_uses_type_column() {
        let filter = BottleneckFilter {
            since: Utc::now(),
            bottleneck_type: Some("slow_query".to_string()),
            severity: None,
            resolved: None,
            resource: None,
            limit: 100,
            offset: 0,
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM performance_bottleneck_logs");
        push_bottleneck_filters(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM performance_bottleneck_logs WHERE created_at >= $1 AND type = $2"
        );
    }
}
