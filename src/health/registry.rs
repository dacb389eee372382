use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::checks::{CompositeHealthCheck, HealthCheck, HttpHealthCheck, TcpHealthCheck};
use super::probes::{HealthProbeManager, LivenessProbe, ReadinessProbe, StartupProbe};
use super::system::SystemIdentity;
use crate::models::{AppConfig, DependencyConfig, DependencyTarget};

/// Assemble the probe manager for a loaded configuration
pub fn manager_from_config(config: &AppConfig) -> HealthProbeManager {
    let probes = &config.probes;
    let checks = checks_from_config(&config.dependencies, probes.check_timeout());

    let readiness = checks.iter().fold(
        ReadinessProbe::new(probes.check_timeout(), probes.cache_ttl()),
        |probe, check| probe.add_check(Arc::clone(check)),
    );
    let startup = checks.iter().fold(
        StartupProbe::new(SystemIdentity::resolve(&config.system), probes.check_timeout()),
        |probe, check| probe.add_check(Arc::clone(check)),
    );
    let liveness = LivenessProbe::new(probes.stall_threshold());

    let not_ready_status = StatusCode::from_u16(probes.not_ready_status).unwrap_or_else(|_| {
        warn!(
            "Invalid not_ready_status {}, using 503",
            probes.not_ready_status
        );
        StatusCode::SERVICE_UNAVAILABLE
    });

    HealthProbeManager::new(liveness, readiness, startup).with_not_ready_status(not_ready_status)
}

/// Build health checks for configured dependencies
pub fn checks_from_config(
    dependencies: &[DependencyConfig],
    default_timeout: Duration,
) -> Vec<Arc<dyn HealthCheck>> {
    dependencies
        .iter()
        .map(|dependency| build_check(dependency, default_timeout))
        .collect()
}

fn build_check(dependency: &DependencyConfig, default_timeout: Duration) -> Arc<dyn HealthCheck> {
    let timeout = dependency.timeout_ms.map(Duration::from_millis);

    match &dependency.target {
        DependencyTarget::Tcp { address } => {
            info!("Registering TCP check '{}' -> {}", dependency.name, address);
            Arc::new(
                TcpHealthCheck::new(&dependency.name, address)
                    .mandatory(dependency.mandatory)
                    .with_timeout(timeout),
            )
        }
        DependencyTarget::Http { url } => {
            info!("Registering HTTP check '{}' -> {}", dependency.name, url);
            Arc::new(
                HttpHealthCheck::new(&dependency.name, url)
                    .mandatory(dependency.mandatory)
                    .with_timeout(timeout),
            )
        }
        DependencyTarget::Group { members } => {
            info!(
                "Registering check group '{}' with {} member(s)",
                dependency.name,
                members.len()
            );
            let member_timeout = timeout.unwrap_or(default_timeout);
            let group = members.iter().fold(
                CompositeHealthCheck::new(&dependency.name, member_timeout)
                    .mandatory(dependency.mandatory),
                |group, member| group.add_check(build_check(member, member_timeout)),
            );
            Arc::new(group)
        }
    }
}
