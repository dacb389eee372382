pub mod checks;
pub mod probes;
pub mod registry;
pub mod runner;
pub mod system;

pub use checks::{
    CompositeHealthCheck, DependencyError, HealthCheck, HealthCheckResult, HealthStatus,
    HttpHealthCheck, TcpHealthCheck,
};
pub use probes::{
    HealthProbeManager, LivenessProbe, LivenessResponse, ReadinessProbe, ReadinessResponse,
    StartupProbe, StartupResponse,
};
pub use registry::checks_from_config;
pub use runner::{CheckSnapshot, DependencyCheck};
pub use system::SystemIdentity;
