pub mod health;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::health::HealthProbeManager;
use crate::metrics::metrics_handler;

/// Probe and metrics routes served by every process
pub fn router(manager: Arc<HealthProbeManager>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/startup", get(health::startup_handler))
        .route("/health/ready", get(health::readiness_handler))
        .route("/health/live", get(health::liveness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(manager)
}
