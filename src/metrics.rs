//! Metrics instrumentation for fdm-pipe-backend.
//!
//! All metrics are prefixed with `fdm_pipe.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record an answered query line.
pub fn record_query(qtype: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Data => "data",
        QueryResult::Soa => "soa",
        QueryResult::NxDomain => "nxdomain",
        QueryResult::Malformed => "malformed",
    };

    counter!("fdm_pipe.query.count", "type" => qtype.to_string(), "result" => result_str)
        .increment(1);
    histogram!("fdm_pipe.query.duration.seconds", "result" => result_str)
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResult {
    /// Routed answer from the partition table.
    Data,
    /// Synthetic SOA answer.
    Soa,
    /// Partition key not in the table.
    NxDomain,
    /// Line could not be parsed.
    Malformed,
}

/// Record a completed handshake.
pub fn record_handshake() {
    counter!("fdm_pipe.handshake.count").increment(1);
}

/// Record the number of keys in the active partition table.
pub fn record_table_size(keys: usize) {
    gauge!("fdm_pipe.partition.keys").set(keys as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
