//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the invoicer server:
//! - HTTP request metrics (latency, counts)
//! - Pipeline status gauges (collected dynamically)
//! - Core pipeline and collaborator metrics

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use invoicer_core::pipeline::RunStatus;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "invoicer_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("invoicer_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "invoicer_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Status (collected dynamically)
// =============================================================================

/// 1 for the current status of each pipeline, 0 for the others.
pub static PIPELINE_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "invoicer_pipeline_status",
            "Current status of each pipeline (1 = active status)",
        ),
        &["pipeline", "status"],
    )
    .unwrap()
});

/// Progress of the current or last run, 0-100.
pub static PIPELINE_PROGRESS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "invoicer_pipeline_progress",
            "Progress percentage of the current or last pipeline run",
        ),
        &["pipeline"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Pipelines
    registry
        .register(Box::new(PIPELINE_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(PIPELINE_PROGRESS.clone()))
        .unwrap();

    // Core metrics (runs, stages, collaborator calls)
    for metric in invoicer_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Update pipeline gauges from the current controller snapshots.
///
/// Called before encoding so a scrape reflects the latest state.
pub async fn collect_dynamic_metrics(state: &AppState) {
    for controller in state.controllers() {
        let kind = controller.kind().as_str();
        let snapshot = controller.status().await;
        for status in RunStatus::ALL {
            PIPELINE_STATUS
                .with_label_values(&[kind, status.as_str()])
                .set(i64::from(snapshot.status == status));
        }
        PIPELINE_PROGRESS
            .with_label_values(&[kind])
            .set(i64::from(snapshot.progress));
    }
}
