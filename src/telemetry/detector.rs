//! Latency threshold classification for bottleneck detection.
//!
//! Two instances exist at runtime: one for database queries (500ms slow,
//! 2000ms critical) and one for HTTP endpoints (1000ms slow, 5000ms
//! critical). Anything below the slow threshold is not a bottleneck.

use serde::{Deserialize, Serialize};

/// Severity of a detected performance bottleneck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    /// Exceeded the slow threshold but not the critical one.
    Warning,
    /// Exceeded the critical threshold.
    Critical,
}

impl BottleneckSeverity {
    /// Returns the lowercase string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for BottleneckSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of latency thresholds in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct LatencyThresholds {
    /// Milliseconds above which the measurement is a bottleneck.
    pub slow: i64,
    /// Milliseconds above which the bottleneck is critical.
    pub critical: i64,
}

impl LatencyThresholds {
    /// Creates a threshold pair.
    #[must_use]
    pub const fn new(slow: i64, critical: i64) -> Self {
        Self { slow, critical }
    }

    /// Classifies a measured duration in milliseconds.
    ///
    /// Returns `None` below the slow threshold, [`BottleneckSeverity::Critical`]
    /// at or above the critical threshold, [`BottleneckSeverity::Warning`]
    /// in between.
    #[must_use]
    pub const fn classify(&self, actual_ms: i64) -> Option<BottleneckSeverity> {
        if actual_ms < self.slow {
            None
        } else if actual_ms >= self.critical {
            Some(BottleneckSeverity::Critical)
        } else {
            Some(BottleneckSeverity::Warning)
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const QUERY: LatencyThresholds = LatencyThresholds::new(500, 2000);
    const ENDPOINT: LatencyThresholds = LatencyThresholds::new(1000, 5000);

    #[test]
    fn fast_query_is_not_a_bottleneck() {
        assert_eq!(QUERY.classify(50), None);
        assert_eq!(QUERY.classify(499), None);
    }

    #[test]
    fn slow_query_is_warning() {
        assert_eq!(QUERY.classify(600), Some(BottleneckSeverity::Warning));
        assert_eq!(QUERY.classify(500), Some(BottleneckSeverity::Warning));
        assert_eq!(QUERY.classify(1999), Some(BottleneckSeverity::Warning));
    }

    #[test]
    fn very_slow_query_is_critical() {
        assert_eq!(QUERY.classify(2500), Some(BottleneckSeverity::Critical));
        assert_eq!(QUERY.classify(2000), Some(BottleneckSeverity::Critical));
    }

    #[test]
    fn endpoint_thresholds_classify_independently() {
        assert_eq!(ENDPOINT.classify(600), None);
        assert_eq!(ENDPOINT.classify(1200), Some(BottleneckSeverity::Warning));
        assert_eq!(ENDPOINT.classify(6000), Some(BottleneckSeverity::Critical));
    }

    #[test]
    fn severity_serializes_lowercase() {
        let Ok(json) = serde_json::to_string(&BottleneckSeverity::Critical) else {
            panic!("severity should serialize");
        };
        assert_eq!(json, "\"critical\"");
        assert_eq!(BottleneckSeverity::Warning.as_str(), "warning");
    }
}
