use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::health::HealthProbeManager;
use crate::metrics::record_probe;

/// `GET /health` - container healthcheck; never touches dependencies
pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    record_probe("health", "ok");
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `GET /health/startup`
pub async fn startup_handler(State(manager): State<Arc<HealthProbeManager>>) -> Response {
    let response = manager.startup().await;
    debug!(
        "Startup probe: started={}, status={}",
        response.started, response.status
    );
    record_probe(
        "startup",
        if response.started { "started" } else { "pending" },
    );

    (StatusCode::OK, Json(response)).into_response()
}

/// `GET /health/ready` - not ready is reported with the configured status code
pub async fn readiness_handler(State(manager): State<Arc<HealthProbeManager>>) -> Response {
    let response = manager.readiness().await;

    let status = if response.ready {
        record_probe("ready", "ready");
        StatusCode::OK
    } else {
        let failing: Vec<&str> = response
            .checks
            .iter()
            .filter(|(_, check)| check.mandatory && !check.status.is_passing())
            .map(|(name, _)| name.as_str())
            .collect();
        warn!("Readiness probe failing: {:?}", failing);
        record_probe("ready", "not_ready");
        manager.not_ready_status()
    };

    (status, Json(response)).into_response()
}

/// `GET /health/live`
pub async fn liveness_handler(State(manager): State<Arc<HealthProbeManager>>) -> Response {
    let response = manager.liveness().await;

    if response.alive {
        record_probe("live", "alive");
    } else {
        warn!("Liveness probe failing: {:?}", response.issues);
        record_probe("live", "dead");
    }

    (StatusCode::OK, Json(response)).into_response()
}
