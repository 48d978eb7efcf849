//! Prometheus metrics for health-assistant-service.
//!
//! Provides HTTP and model-call metrics for observability.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Once, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// HTTP metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Model metrics
pub static MODEL_CALLS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static MODEL_RETRIES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static MODEL_CALL_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

static INIT: Once = Once::new();

/// Initialize all metrics. Calling it again is a no-op.
pub fn init_metrics() {
    INIT.call_once(|| match build_registry() {
        Ok(()) => tracing::info!("Prometheus metrics initialized"),
        Err(e) => tracing::error!(error = %e, "Failed to initialize Prometheus metrics"),
    });
}

fn build_registry() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;

    let http_request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method", "path"],
    )?;

    // outcome: success, exhausted, upstream, timed_out, cancelled
    let model_calls = IntCounterVec::new(
        Opts::new("model_calls_total", "Total model calls by final outcome"),
        &["operation", "outcome"],
    )?;

    let model_retries = IntCounterVec::new(
        Opts::new("model_retries_total", "Model call attempts beyond the first"),
        &["operation"],
    )?;

    let model_duration = HistogramVec::new(
        HistogramOpts::new(
            "model_call_duration_seconds",
            "Model call latency including retries, in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["operation"],
    )?;

    registry.register(Box::new(http_requests_total.clone()))?;
    registry.register(Box::new(http_request_duration.clone()))?;
    registry.register(Box::new(model_calls.clone()))?;
    registry.register(Box::new(model_retries.clone()))?;
    registry.register(Box::new(model_duration.clone()))?;

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(http_request_duration);
    let _ = MODEL_CALLS_TOTAL.set(model_calls);
    let _ = MODEL_RETRIES_TOTAL.set(model_retries);
    let _ = MODEL_CALL_DURATION_SECONDS.set(model_duration);

    Ok(())
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

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a completed HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

/// Record the final outcome of a model call.
pub fn record_model_call(operation: &str, outcome: &str, duration_secs: f64) {
    if let Some(counter) = MODEL_CALLS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
    if let Some(histogram) = MODEL_CALL_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}

/// Record one retry of a model call.
pub fn record_model_retry(operation: &str) {
    if let Some(counter) = MODEL_RETRIES_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}
