use crate::models::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&contents)
}

/// Parse and validate YAML configuration
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    config.validate().map_err(ConfigError::Invalid)?;

    info!(
        "Configuration loaded with {} dependency check(s)",
        config.dependencies.len()
    );
    for dependency in &config.dependencies {
        info!(
            "  - {} ({})",
            dependency.name,
            if dependency.mandatory {
                "mandatory"
            } else {
                "optional"
            }
        );
    }

    Ok(config)
}

/// Load configuration with fallback options, then apply environment overrides.
///
/// Without any config file the responder runs with defaults and no
/// dependencies, which keeps `/health/startup` and `/health/ready` trivially green.
pub fn load_config_with_fallback() -> Result<Arc<AppConfig>, ConfigError> {
    let mut config = find_config()?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(Arc::new(config))
}

fn find_config() -> Result<AppConfig, ConfigError> {
    // An explicit path must load; a typo should not silently drop all checks
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        return load_config(&config_path);
    }

    let paths = ["config.yaml", "config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    warn!("No configuration file found, running with defaults and no dependency checks");
    Ok(AppConfig::default())
}

/// Apply `HOST`, `PORT`, `ENVIRONMENT`, `POD_NAME` and `HOSTNAME` overrides
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("HOST") {
        config.server.host = host;
    }

    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("PORT '{}' is not a valid port", port)))?;
    }

    if let Some(environment) = lookup("ENVIRONMENT") {
        config.system.environment = Some(environment);
    }

    if let Some(pod_name) = lookup("POD_NAME") {
        config.system.pod_name = Some(pod_name);
    }

    if config.system.hostname.is_none() {
        config.system.hostname = lookup("HOSTNAME");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyTarget;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
server:
  port: 9000
probes:
  check_timeout_ms: 2000
dependencies:
  - name: temporal
    kind: tcp
    address: "temporal:7233"
  - name: databases
    kind: group
    members:
      - name: neo4j
        kind: tcp
        address: "neo4j:7687"
      - name: weaviate
        kind: http
        url: "http://weaviate:8080/v1/.well-known/ready"
  - name: services
    kind: http
    url: "http://backend:8000/health"
    mandatory: false
    timeout_ms: 1000
"#;

    #[test]
    fn test_load_valid_config() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.probes.check_timeout_ms, 2000);
        assert_eq!(config.probes.not_ready_status, 503);
        assert_eq!(config.dependencies.len(), 3);

        let databases = &config.dependencies[1];
        assert!(databases.mandatory);
        match &databases.target {
            DependencyTarget::Group { members } => assert_eq!(members.len(), 2),
            other => panic!("expected group, got {:?}", other),
        }

        let services = &config.dependencies[2];
        assert!(!services.mandatory);
        assert_eq!(services.timeout_ms, Some(1000));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert!(config.dependencies.is_empty());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.probes.cache_ttl_ms, 500);
    }

    #[test]
    fn test_config_validation_duplicate_names() {
        let yaml = r#"
dependencies:
  - name: temporal
    kind: tcp
    address: "a:1"
  - name: temporal
    kind: tcp
    address: "b:2"
"#;
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate dependency name"));
    }

    #[test]
    fn test_config_validation_empty_group() {
        let yaml = r#"
dependencies:
  - name: databases
    kind: group
    members: []
"#;
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("at least one member"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let yaml = r#"
probes:
  check_timeout_ms: 0
"#;
        assert!(matches!(
            parse_config(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_config_validation_informational_not_ready_status() {
        let yaml = r#"
probes:
  not_ready_status: 100
"#;
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("not_ready_status"));

        let config = parse_config("probes:\n  not_ready_status: 200\n").unwrap();
        assert_eq!(config.probes.not_ready_status, 200);
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let yaml = r#"
dependencies:
  - name: redis
    kind: carrier-pigeon
"#;
        assert!(matches!(parse_config(yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "8080"),
            ("ENVIRONMENT", "production"),
            ("POD_NAME", "worker-7f9c"),
            ("HOSTNAME", "node-1"),
        ]);
        let mut config = AppConfig::default();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.system.environment.as_deref(), Some("production"));
        assert_eq!(config.system.pod_name.as_deref(), Some("worker-7f9c"));
        assert_eq!(config.system.hostname.as_deref(), Some("node-1"));
    }

    #[test]
    fn test_env_override_invalid_port() {
        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config, |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/hey-health.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
