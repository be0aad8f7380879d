//! Metrics recording for store operations.

use crate::Result;
use std::time::Instant;

/// Records operation metrics for a store call.
///
/// Emits `storage_operations_total` (by backend, operation and status) and
/// `storage_operation_duration_ms`.
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Runs a store operation and records its outcome and latency.
pub fn timed<T>(
    backend: &'static str,
    operation: &'static str,
    op: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let start = Instant::now();
    let result = op();
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(backend, operation, start, status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_timed_passes_value_through() {
        let value = timed("sqlite", "get", || Ok(7)).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_timed_passes_error_through() {
        let result: Result<()> = timed("sqlite", "insert", || Err(Error::store("insert", "boom")));
        assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
    }

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        // No recorder installed: recording is a no-op and must not panic
        record_operation_metrics("sqlite", "count_by_key", Instant::now(), "success");
    }
}
