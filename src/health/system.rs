use serde::Serialize;
use sysinfo::System;
use tracing::debug;

use crate::models::SystemConfig;

/// Identity block reported by `/health/startup`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SystemIdentity {
    pub hostname: String,
    pub environment: String,
    pub pod_name: String,
}

impl SystemIdentity {
    /// Resolve once at boot. Hostname falls back to the OS hostname,
    /// the pod name to the hostname.
    pub fn resolve(config: &SystemConfig) -> Self {
        let hostname = config
            .hostname
            .clone()
            .or_else(os_hostname)
            .unwrap_or_else(|| "unknown".to_string());

        let environment = config
            .environment
            .clone()
            .unwrap_or_else(|| "development".to_string());

        let pod_name = config.pod_name.clone().unwrap_or_else(|| hostname.clone());

        debug!(
            "Resolved system identity: hostname={}, environment={}, pod_name={}",
            hostname, environment, pod_name
        );

        Self {
            hostname,
            environment,
            pod_name,
        }
    }
}

fn os_hostname() -> Option<String> {
    System::host_name()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
