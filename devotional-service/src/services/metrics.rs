//! Prometheus metrics for devotional-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for job runs by job and outcome.
pub static JOB_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "devotional_job_runs_total",
        "Total number of job invocations",
        &["job", "outcome"]
    )
    .expect("Failed to register JOB_RUNS")
});

/// Counter for generation calls by job and result.
pub static GENERATION_CALLS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "devotional_generation_calls_total",
        "Total number of generation API calls",
        &["job", "result"]
    )
    .expect("Failed to register GENERATION_CALLS")
});

/// Histogram for generation duration, retries included.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "devotional_generation_duration_seconds",
        "Generation duration in seconds",
        &["job"],
        vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register GENERATION_DURATION")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "devotional_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&JOB_RUNS);
    Lazy::force(&GENERATION_CALLS);
    Lazy::force(&GENERATION_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a finished job run.
pub fn record_job_run(job: &str, outcome: &str) {
    JOB_RUNS.with_label_values(&[job, outcome]).inc();
}

/// Record a generation call result.
pub fn record_generation_call(job: &str, result: &str) {
    GENERATION_CALLS.with_label_values(&[job, result]).inc();
}

/// Record generation duration.
pub fn record_generation_duration(job: &str, duration_secs: f64) {
    GENERATION_DURATION
        .with_label_values(&[job])
        .observe(duration_secs);
}
