//! Prometheus metrics for the mentor service.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Completion metrics
pub static COMPLETIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static COMPLETION_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Background task metrics
pub static BACKGROUND_TASKS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Must be called once at startup.
pub fn init_metrics() {
    let registry = Registry::new();

    let completions = IntCounterVec::new(
        Opts::new("mentor_completions_total", "Total completion invocations"),
        &["mode", "model", "outcome"],
    )
    .expect("Failed to create mentor_completions_total metric");

    let completion_latency = HistogramVec::new(
        HistogramOpts::new(
            "mentor_completion_latency_seconds",
            "Completion latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["mode", "model"],
    )
    .expect("Failed to create mentor_completion_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("mentor_provider_errors_total", "Total AI provider errors"),
        &["kind"],
    )
    .expect("Failed to create mentor_provider_errors_total metric");

    let background_tasks = IntCounterVec::new(
        Opts::new(
            "mentor_background_tasks_total",
            "Background task outcomes (memory summarization, title generation)",
        ),
        &["task", "outcome"],
    )
    .expect("Failed to create mentor_background_tasks_total metric");

    registry
        .register(Box::new(completions.clone()))
        .expect("Failed to register mentor_completions_total");
    registry
        .register(Box::new(completion_latency.clone()))
        .expect("Failed to register mentor_completion_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register mentor_provider_errors_total");
    registry
        .register(Box::new(background_tasks.clone()))
        .expect("Failed to register mentor_background_tasks_total");

    let _ = REGISTRY.set(registry);
    let _ = COMPLETIONS_TOTAL.set(completions);
    let _ = COMPLETION_LATENCY_SECONDS.set(completion_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = BACKGROUND_TASKS_TOTAL.set(background_tasks);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Failed to convert metrics to UTF-8: {}\n", e))
}

/// Record a completed (or failed) completion invocation.
pub fn record_completion(mode: &str, model: &str, outcome: &str, duration_secs: f64) {
    if let Some(counter) = COMPLETIONS_TOTAL.get() {
        counter.with_label_values(&[mode, model, outcome]).inc();
    }
    if let Some(histogram) = COMPLETION_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[mode, model])
            .observe(duration_secs);
    }
}

/// Record a provider error by taxonomy kind.
pub fn record_provider_error(kind: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[kind]).inc();
    }
}

/// Record a background task outcome.
pub fn record_task_outcome(task: &str, outcome: &str) {
    if let Some(counter) = BACKGROUND_TASKS_TOTAL.get() {
        counter.with_label_values(&[task, outcome]).inc();
    }
}
