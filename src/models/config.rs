use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Root configuration for the probe responder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
    /// Dependencies checked by the startup and readiness probes
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Identity reported in the startup probe's `system` block.
/// Unset fields are resolved from the environment at boot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub hostname: Option<String>,
    pub environment: Option<String>,
    pub pod_name: Option<String>,
}

/// Probe timing and status code settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Default per-dependency timeout (default: 3000)
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    /// Readiness result sharing window; 0 disables caching (default: 500)
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Background startup polling interval; 0 disables the watcher (default: 2)
    #[serde(default = "default_startup_poll_interval_secs")]
    pub startup_poll_interval_secs: u64,
    /// Liveness heartbeat period (default: 1000)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Heartbeat age after which the process reports not alive (default: 30)
    #[serde(default = "default_stall_threshold_secs")]
    pub stall_threshold_secs: u64,
    /// HTTP status returned by `/health/ready` when not ready (default: 503)
    #[serde(default = "default_not_ready_status")]
    pub not_ready_status: u16,
}

impl ProbeConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn startup_poll_interval(&self) -> Option<Duration> {
        (self.startup_poll_interval_secs > 0)
            .then(|| Duration::from_secs(self.startup_poll_interval_secs))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: default_check_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            startup_poll_interval_secs: default_startup_poll_interval_secs(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            stall_threshold_secs: default_stall_threshold_secs(),
            not_ready_status: default_not_ready_status(),
        }
    }
}

fn default_check_timeout_ms() -> u64 {
    3000
}

fn default_cache_ttl_ms() -> u64 {
    500
}

fn default_startup_poll_interval_secs() -> u64 {
    2
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

fn default_stall_threshold_secs() -> u64 {
    30
}

fn default_not_ready_status() -> u16 {
    503
}

/// A dependency checked by the probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Name reported under `checks` (e.g. `temporal`, `databases`)
    pub name: String,
    /// Whether failure gates startup and readiness
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    /// Overrides `probes.check_timeout_ms`
    pub timeout_ms: Option<u64>,
    #[serde(flatten)]
    pub target: DependencyTarget,
}

fn default_mandatory() -> bool {
    true
}

/// How a dependency is reached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DependencyTarget {
    /// TCP connect to `host:port`
    Tcp { address: String },
    /// HTTP GET; 2xx, 401 and 403 count as reachable
    Http { url: String },
    /// Several dependencies reported under one name
    Group { members: Vec<DependencyConfig> },
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.probes.check_timeout_ms == 0 {
            return Err("probes.check_timeout_ms must be greater than zero".to_string());
        }

        if self.probes.heartbeat_interval_ms == 0 {
            return Err("probes.heartbeat_interval_ms must be greater than zero".to_string());
        }

        if self.probes.stall_threshold().as_millis() <= self.probes.heartbeat_interval_ms as u128
        {
            return Err(
                "probes.stall_threshold_secs must exceed probes.heartbeat_interval_ms".to_string(),
            );
        }

        if !(200..=599).contains(&self.probes.not_ready_status) {
            return Err(format!(
                "probes.not_ready_status '{}' is not a final HTTP status (200-599)",
                self.probes.not_ready_status
            ));
        }

        validate_dependencies(&self.dependencies, "dependencies")
    }
}

fn validate_dependencies(dependencies: &[DependencyConfig], scope: &str) -> Result<(), String> {
    let mut seen = HashSet::new();

    for dependency in dependencies {
        if dependency.name.trim().is_empty() {
            return Err(format!("{}: dependency name must not be empty", scope));
        }

        if !seen.insert(dependency.name.as_str()) {
            return Err(format!(
                "{}: duplicate dependency name '{}'",
                scope, dependency.name
            ));
        }

        if dependency.timeout_ms == Some(0) {
            return Err(format!(
                "{}: dependency '{}' timeout_ms must be greater than zero",
                scope, dependency.name
            ));
        }

        match &dependency.target {
            DependencyTarget::Tcp { address } if address.trim().is_empty() => {
                return Err(format!(
                    "{}: dependency '{}' has an empty address",
                    scope, dependency.name
                ));
            }
            DependencyTarget::Http { url } if url.trim().is_empty() => {
                return Err(format!(
                    "{}: dependency '{}' has an empty url",
                    scope, dependency.name
                ));
            }
            DependencyTarget::Group { members } => {
                if members.is_empty() {
                    return Err(format!(
                        "{}: group '{}' must have at least one member",
                        scope, dependency.name
                    ));
                }
                validate_dependencies(members, &format!("{}.{}", scope, dependency.name))?;
            }
            _ => {}
        }
    }

    Ok(())
}
