pub mod prometheus_metrics;

pub use prometheus_metrics::{
    metrics_handler, record_dependency_check, record_probe, record_started, MetricsRegistry,
    METRICS_REGISTRY,
};
