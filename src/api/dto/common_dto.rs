//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::IngestSummary;

/// Response body for single-entity writes (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// ID of the created record.
    pub id: Uuid,
}

impl CreatedResponse {
    /// Builds a creation confirmation.
    #[must_use]
    pub fn new(message: &str, id: Uuid) -> Self {
        Self {
            message: message.to_string(),
            id,
        }
    }
}

/// Response body for batch writes (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchAcceptedResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Items persisted.
    pub succeeded: usize,
    /// Items dropped after logging.
    pub failed: usize,
    /// Items received.
    pub total: usize,
}

impl BatchAcceptedResponse {
    /// Builds an acceptance summary from a batch outcome.
    #[must_use]
    pub fn new(message: &str, summary: IngestSummary) -> Self {
        Self {
            message: message.to_string(),
            succeeded: summary.succeeded,
            failed: summary.failed,
            total: summary.total,
        }
    }
}

/// Paginated list envelope for the log read endpoints.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    /// Records in the requested page, newest first.
    pub records: Vec<T>,
    /// Total matching records across all pages.
    pub total: i64,
    /// Page size that was applied.
    pub limit: i64,
    /// Offset that was applied.
    pub offset: i64,
}

impl<T> Paginated<T> {
    /// Wraps one page of records with its pagination metadata.
    #[must_use]
    pub fn new(records: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            records,
            total,
            limit,
            offset,
        }
    }
}
