//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job lifecycle (submissions, polls, confirmations, outcomes)
//! - Job service requests

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Job Lifecycle Metrics
// =============================================================================

/// Jobs submitted for preview.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printwizard_jobs_submitted_total",
        "Total print jobs submitted for preview",
    )
    .unwrap()
});

/// Status polls by outcome.
pub static POLLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("printwizard_polls_total", "Total job status polls"),
        &["outcome"], // "in_progress", "preview_ready", "done", "error", "unrecognized", "failed"
    )
    .unwrap()
});

/// Responses dropped because the job was reset or superseded.
pub static STALE_RESPONSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printwizard_stale_responses_total",
        "Job service responses dropped as stale",
    )
    .unwrap()
});

/// Confirmations by result.
pub static CONFIRMATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("printwizard_confirmations_total", "Total job confirmations"),
        &["result"], // "success", "rejected", "failed"
    )
    .unwrap()
});

/// Jobs reaching a terminal phase.
pub static TERMINAL_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "printwizard_job_outcomes_total",
            "Jobs reaching a terminal phase",
        ),
        &["phase"], // "done", "error"
    )
    .unwrap()
});

// =============================================================================
// Job Service Metrics
// =============================================================================

/// Job service request duration in seconds.
pub static REMOTE_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "printwizard_remote_request_duration_seconds",
            "Duration of job service requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"], // "create_job", "job_status", "job_files", "confirm_job"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Lifecycle
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(POLLS_TOTAL.clone()),
        Box::new(STALE_RESPONSES.clone()),
        Box::new(CONFIRMATIONS.clone()),
        Box::new(TERMINAL_OUTCOMES.clone()),
        // Job service
        Box::new(REMOTE_REQUEST_DURATION.clone()),
    ]
}
