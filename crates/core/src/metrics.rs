//! Prometheus metrics for pipeline runs.
//!
//! This module provides metrics for:
//! - Triggers (admitted, rejected)
//! - Runs (completed, failed, abandoned) and their duration
//! - Stage durations
//! - Collaborator calls

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Trigger Metrics
// =============================================================================

/// Trigger requests by pipeline and result.
pub static PIPELINE_TRIGGERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("invoicer_pipeline_triggers_total", "Total pipeline trigger requests"),
        &["pipeline", "result"], // "admitted", "rejected"
    )
    .unwrap()
});

// =============================================================================
// Run Metrics
// =============================================================================

/// Finished runs by pipeline and result.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("invoicer_pipeline_runs_total", "Total pipeline runs"),
        &["pipeline", "result"], // "completed", "failed", "abandoned"
    )
    .unwrap()
});

/// Run duration in seconds.
pub static PIPELINE_RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "invoicer_pipeline_run_duration_seconds",
            "Duration of pipeline runs",
        )
        .buckets(vec![
            10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0,
        ]),
        &["pipeline", "result"],
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "invoicer_stage_duration_seconds",
            "Duration of successfully completed stages",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["pipeline", "stage"],
    )
    .unwrap()
});

// =============================================================================
// Collaborator Metrics
// =============================================================================

/// Collaborator calls by operation and status.
pub static COLLABORATOR_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "invoicer_collaborator_calls_total",
            "Total collaborator calls",
        ),
        &["operation", "status"], // status: "success", "error", "timeout"
    )
    .unwrap()
});

/// Collaborator call duration.
pub static COLLABORATOR_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "invoicer_collaborator_call_duration_seconds",
            "Duration of collaborator calls",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 1800.0]),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PIPELINE_TRIGGERS.clone()),
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_RUN_DURATION.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(COLLABORATOR_CALLS.clone()),
        Box::new(COLLABORATOR_CALL_DURATION.clone()),
    ]
}
