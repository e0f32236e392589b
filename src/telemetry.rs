//! Telemetry utilities for operation timing and request correlation.

use std::time::Instant;

/// Guard for timing an engine operation and recording metrics.
///
/// Records latency when dropped, so early returns are timed too.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_operation(self.operation, duration);
    }
}

/// Standardized span constructors for HTTP observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for an HTTP request.
    pub fn request(method: &str, path: &str, actor: Option<&str>) -> Span {
        if let Some(actor) = actor {
            info_span!("request", method = %method, path = %path, actor = %actor)
        } else {
            info_span!("request", method = %method, path = %path)
        }
    }
}
