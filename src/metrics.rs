//! Prometheus metrics collection for sanctiond.
//!
//! Exposed on the HTTP listener at `/metrics`.
//!
//! - `moderation_reports_total{severity}` - Reports accepted
//! - `moderation_rejections_total{operation,kind}` - Refused requests by error kind
//! - `moderation_sanctions_total{kind,tier}` - Sanctions applied
//! - `moderation_appeals_total{appeal_type}` - Appeals filed
//! - `moderation_appeal_decisions_total{decision}` - Appeal resolutions
//! - `moderation_operation_duration_seconds{operation}` - Engine latency histogram

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Reports accepted, by derived severity.
pub static REPORTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Requests refused, by operation and error kind.
pub static REJECTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Sanctions applied, by kind and tier.
pub static SANCTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Appeals filed, by appeal type.
pub static APPEALS: OnceLock<IntCounterVec> = OnceLock::new();

/// Appeal resolutions, by decision.
pub static APPEAL_DECISIONS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Engine operation latency.
pub static OPERATION_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at startup. Later calls are no-ops.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(REPORTS, IntCounterVec::new(Opts::new("moderation_reports_total", "Reports accepted by severity"), &["severity"]));
    register!(REJECTIONS, IntCounterVec::new(Opts::new("moderation_rejections_total", "Refused requests by operation and error kind"), &["operation", "kind"]));
    register!(SANCTIONS, IntCounterVec::new(Opts::new("moderation_sanctions_total", "Sanctions applied by kind and tier"), &["kind", "tier"]));
    register!(APPEALS, IntCounterVec::new(Opts::new("moderation_appeals_total", "Appeals filed by type"), &["appeal_type"]));
    register!(APPEAL_DECISIONS, IntCounterVec::new(Opts::new("moderation_appeal_decisions_total", "Appeal resolutions by decision"), &["decision"]));
    register!(OPERATION_LATENCY, HistogramVec::new(
        HistogramOpts::new("moderation_operation_duration_seconds", "Engine operation latency")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

fn inc(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

#[inline]
pub fn record_report(severity: &str) {
    inc(&REPORTS, &[severity]);
}

#[inline]
pub fn record_rejection(operation: &str, kind: &str) {
    inc(&REJECTIONS, &[operation, kind]);
}

#[inline]
pub fn record_sanction(kind: &str, tier: &str) {
    inc(&SANCTIONS, &[kind, tier]);
}

#[inline]
pub fn record_appeal(appeal_type: &str) {
    inc(&APPEALS, &[appeal_type]);
}

#[inline]
pub fn record_decision(decision: &str) {
    inc(&APPEAL_DECISIONS, &[decision]);
}

/// Record an engine operation's latency.
#[inline]
pub fn record_operation(operation: &str, duration_secs: f64) {
    if let Some(h) = OPERATION_LATENCY.get() {
        h.with_label_values(&[operation]).observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_report("medium");
        record_rejection("submit_report", "rate_limit_error");
        record_operation("submit_report", 0.002);

        let output = gather_metrics();
        assert!(output.contains("moderation_reports_total"));
        assert!(output.contains("moderation_rejections_total"));
        assert!(output.contains("moderation_operation_duration_seconds"));
    }
}
