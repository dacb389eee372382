use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::health::HealthStatus;

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::new());
}

pub struct MetricsRegistry {
    pub registry: Registry,

    // Probe traffic
    pub probe_requests_total: IntCounterVec,

    // Dependency checks
    pub dependency_check_duration_seconds: HistogramVec,
    pub dependency_up: IntGaugeVec,

    // Process state
    pub started: IntGauge,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let probe_requests_total = IntCounterVec::new(
            Opts::new("probe_requests_total", "Total number of health probe requests"),
            &["probe", "outcome"],
        )
        .expect("probe_requests_total definition is valid");

        let dependency_check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "dependency_check_duration_seconds",
                "Dependency check duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["dependency"],
        )
        .expect("dependency_check_duration_seconds definition is valid");

        let dependency_up = IntGaugeVec::new(
            Opts::new(
                "dependency_up",
                "Whether the last check of a dependency passed (1) or failed (0)",
            ),
            &["dependency"],
        )
        .expect("dependency_up definition is valid");

        let started = IntGauge::new("process_started", "Whether the startup gate has opened")
            .expect("process_started definition is valid");

        for collector in [
            Box::new(probe_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(dependency_check_duration_seconds.clone()),
            Box::new(dependency_up.clone()),
            Box::new(started.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric names are unique within the registry");
        }

        Self {
            registry,
            probe_requests_total,
            dependency_check_duration_seconds,
            dependency_up,
            started,
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn record_probe(probe: &str, outcome: &str) {
    METRICS_REGISTRY
        .probe_requests_total
        .with_label_values(&[probe, outcome])
        .inc();
}

pub fn record_dependency_check(dependency: &str, status: HealthStatus, duration_secs: f64) {
    METRICS_REGISTRY
        .dependency_check_duration_seconds
        .with_label_values(&[dependency])
        .observe(duration_secs);
    METRICS_REGISTRY
        .dependency_up
        .with_label_values(&[dependency])
        .set(status.is_passing() as i64);
}

pub fn record_started() {
    METRICS_REGISTRY.started.set(1);
}

/// Metrics handler for Prometheus
pub async fn metrics_handler() -> Response {
    match METRICS_REGISTRY.render() {
        Ok(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        )
            .into_response(),
    }
}
