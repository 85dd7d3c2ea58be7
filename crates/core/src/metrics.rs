//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Searches and session lookups
//! - Resource resolution (per-kind attempts, final outcome)
//! - Dispatch and job completion
//! - External services (nullbr, CloudDrive2, qBittorrent)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Searches total by result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nullfetch_searches_total", "Total keyword searches"),
        &["result"], // "found", "empty", "error"
    )
    .unwrap()
});

/// Items returned per search.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nullfetch_search_results",
            "Number of media items returned per search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Per-kind fetch attempts made while resolving.
pub static RESOLUTION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nullfetch_resolution_attempts_total",
            "Resource fetch attempts by kind and outcome",
        ),
        &["kind", "outcome"], // outcome: "found", "empty", "error", "timeout"
    )
    .unwrap()
});

/// Resolutions total by result.
pub static RESOLUTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nullfetch_resolutions_total", "Total resource resolutions"),
        &["result"], // "resolved", "no_resource", "missing_id", "disabled", "error"
    )
    .unwrap()
});

/// Entries in resolved bundles.
pub static RESOURCES_RETURNED: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nullfetch_resources_returned",
            "Number of entries in a resolved bundle",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Dispatch Metrics
// =============================================================================

/// Dispatches total by kind and result.
pub static DISPATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nullfetch_dispatches_total", "Total dispatch attempts"),
        &["kind", "result"], // result: "success", "failure", "unsupported"
    )
    .unwrap()
});

/// Jobs reported newly completed by the tracker.
pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "nullfetch_jobs_completed_total",
        "Transfer jobs observed completing",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nullfetch_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nullfetch_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one external call.
pub fn observe_external(service: &str, operation: &str, seconds: f64, ok: bool) {
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(seconds);
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, if ok { "success" } else { "error" }])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        // Resolution
        Box::new(RESOLUTION_ATTEMPTS.clone()),
        Box::new(RESOLUTIONS_TOTAL.clone()),
        Box::new(RESOURCES_RETURNED.clone()),
        // Dispatch
        Box::new(DISPATCHES_TOTAL.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
