use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::checks::{DependencyError, HealthCheck, HealthCheckResult, HealthStatus};
use crate::metrics;

/// Result of one dependency check as reported under `checks`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DependencyCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    pub mandatory: bool,
    pub latency_ms: u64,
}

impl DependencyCheck {
    fn new(result: HealthCheckResult, mandatory: bool, latency_ms: u64) -> Self {
        Self {
            status: result.status,
            issues: result.issues,
            mandatory,
            latency_ms,
        }
    }
}

/// Check results keyed by dependency name
pub type CheckSnapshot = BTreeMap<String, DependencyCheck>;

/// Run a single check on its own task, bounded by `limit`.
///
/// Timeouts and panics inside the check become unhealthy entries.
pub async fn run_check(check: Arc<dyn HealthCheck>, limit: Duration) -> DependencyCheck {
    let label = check.name().to_string();
    run_labelled(check, limit, label).await
}

/// Same as [`run_check`], reporting metrics under `label`
async fn run_labelled(
    check: Arc<dyn HealthCheck>,
    limit: Duration,
    name: String,
) -> DependencyCheck {
    let mandatory = check.is_mandatory();
    let limit = check.timeout().unwrap_or(limit);
    let start = Instant::now();

    let mut task = tokio::spawn(async move { check.check().await });

    let result = match timeout(limit, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            error!("Health check '{}' panicked: {}", name, join_error);
            HealthCheckResult::unhealthy("check panicked")
        }
        Err(_) => {
            task.abort();
            warn!("Health check '{}' timed out after {:?}", name, limit);
            HealthCheckResult::from_error(&DependencyError::Timeout(limit))
        }
    };

    let elapsed = start.elapsed();
    metrics::record_dependency_check(&name, result.status, elapsed.as_secs_f64());
    debug!(
        "Health check '{}' finished: {} in {}ms",
        name,
        result.status,
        elapsed.as_millis()
    );

    DependencyCheck::new(result, mandatory, elapsed.as_millis() as u64)
}

/// Run every check concurrently and collect the results by name
pub async fn run_checks(checks: &[Arc<dyn HealthCheck>], limit: Duration) -> CheckSnapshot {
    run_all(checks, limit, None).await
}

/// Run the members of a group; metrics are labelled `group.member`
pub async fn run_member_checks(
    group: &str,
    checks: &[Arc<dyn HealthCheck>],
    limit: Duration,
) -> CheckSnapshot {
    run_all(checks, limit, Some(group)).await
}

async fn run_all(
    checks: &[Arc<dyn HealthCheck>],
    limit: Duration,
    group: Option<&str>,
) -> CheckSnapshot {
    let futures = checks
        .iter()
        .map(|check| {
            let name = check.name().to_string();
            let label = match group {
                Some(group) => format!("{}.{}", group, name),
                None => name.clone(),
            };
            let run = run_labelled(Arc::clone(check), limit, label);
            async move { (name, run.await) }
        })
        .collect::<Vec<_>>();

    join_all(futures).await.into_iter().collect()
}

/// Overall status of a snapshot; optional failures only degrade it
pub fn aggregate_status(snapshot: &CheckSnapshot) -> HealthStatus {
    snapshot
        .values()
        .map(|check| {
            if check.mandatory {
                check.status
            } else {
                check.status.min(HealthStatus::Degraded)
            }
        })
        .fold(HealthStatus::Healthy, HealthStatus::worst)
}

/// True when every mandatory check passes
pub fn mandatory_passing(snapshot: &CheckSnapshot) -> bool {
    snapshot
        .values()
        .filter(|check| check.mandatory)
        .all(|check| check.status.is_passing())
}
