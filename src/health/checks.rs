use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::runner::run_member_checks;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Reachable dependencies pass, even when they report trouble.
    pub fn is_passing(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy)
    }

    /// The worse of two statuses.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Failure modes of a dependency check
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DependencyError {
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("degraded: {0}")]
    Degraded(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl DependencyError {
    pub fn status(&self) -> HealthStatus {
        match self {
            DependencyError::Degraded(_) => HealthStatus::Degraded,
            DependencyError::Unreachable(_)
            | DependencyError::Unavailable(_)
            | DependencyError::Timeout(_) => HealthStatus::Unhealthy,
        }
    }
}

/// Outcome of a single check, before the runner attaches name and latency
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            issues: Vec::new(),
        }
    }

    pub fn degraded(issue: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            issues: vec![issue.into()],
        }
    }

    pub fn unhealthy(issue: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            issues: vec![issue.into()],
        }
    }

    pub fn from_error(error: &DependencyError) -> Self {
        Self {
            status: error.status(),
            issues: vec![error.to_string()],
        }
    }
}

/// A named, pingable dependency
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Name reported under `checks`
    fn name(&self) -> &str;

    /// Perform the health check
    async fn check(&self) -> HealthCheckResult;

    /// Whether a failure gates startup and readiness
    fn is_mandatory(&self) -> bool {
        true
    }

    /// Per-check timeout; the runner default applies when `None`
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// TCP connect check (Temporal frontend, Neo4j bolt)
pub struct TcpHealthCheck {
    name: String,
    address: String,
    mandatory: bool,
    timeout: Option<Duration>,
}

impl TcpHealthCheck {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            mandatory: true,
            timeout: None,
        }
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthCheck for TcpHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthCheckResult {
        match TcpStream::connect(&self.address).await {
            Ok(_) => {
                debug!("TCP check '{}' connected to {}", self.name, self.address);
                HealthCheckResult::healthy()
            }
            Err(e) => {
                warn!("TCP check '{}' failed for {}: {}", self.name, self.address, e);
                HealthCheckResult::from_error(&DependencyError::Unreachable(format!(
                    "{}: {}",
                    self.address, e
                )))
            }
        }
    }

    fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// HTTP GET check (Weaviate readiness, downstream FastAPI services).
///
/// 2xx, 401 and 403 are healthy, 5xx is unhealthy, anything else is degraded.
pub struct HttpHealthCheck {
    name: String,
    url: String,
    mandatory: bool,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl HttpHealthCheck {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            mandatory: true,
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthCheckResult {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();

                // 401/403 means the endpoint is up and wants credentials
                if status.is_success() || status == 401 || status == 403 {
                    return HealthCheckResult::healthy();
                }

                warn!("HTTP check '{}' returned status: {}", self.name, status);
                let detail = format!("{} returned status {}", self.url, status);
                if status.is_server_error() {
                    HealthCheckResult::from_error(&DependencyError::Unavailable(detail))
                } else {
                    HealthCheckResult::from_error(&DependencyError::Degraded(detail))
                }
            }
            Err(e) => {
                warn!("HTTP check '{}' failed: {}", self.name, e);
                HealthCheckResult::from_error(&DependencyError::Unreachable(format!(
                    "{}: {}",
                    self.url, e
                )))
            }
        }
    }

    fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Several checks reported under one name, e.g. `databases`
pub struct CompositeHealthCheck {
    name: String,
    members: Vec<Arc<dyn HealthCheck>>,
    mandatory: bool,
    member_timeout: Duration,
}

impl CompositeHealthCheck {
    pub fn new(name: impl Into<String>, member_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            mandatory: true,
            member_timeout,
        }
    }

    pub fn add_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.members.push(check);
        self
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }
}

#[async_trait]
impl HealthCheck for CompositeHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthCheckResult {
        let results = run_member_checks(&self.name, &self.members, self.member_timeout).await;

        let mut status = HealthStatus::Healthy;
        let mut issues = Vec::new();

        for (member, result) in results {
            // Optional members can only degrade the group
            let member_status = if result.mandatory {
                result.status
            } else {
                result.status.min(HealthStatus::Degraded)
            };
            status = status.worst(member_status);
            issues.extend(
                result
                    .issues
                    .into_iter()
                    .map(|issue| format!("{}: {}", member, issue)),
            );
        }

        HealthCheckResult { status, issues }
    }

    fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    fn timeout(&self) -> Option<Duration> {
        // Members are bounded individually; leave headroom for the slowest one
        let slowest = self
            .members
            .iter()
            .map(|member| member.timeout().unwrap_or(self.member_timeout))
            .max()
            .unwrap_or(self.member_timeout);
        Some(slowest + Duration::from_millis(250))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::runner::run_check;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    /// Local server answering each path with a fixed status
    async fn serve_statuses() -> String {
        let app = Router::new()
            .route("/ready", get(|| async { StatusCode::OK }))
            .route("/auth", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
            .route("/busy", get(|| async { StatusCode::TOO_MANY_REQUESTS }))
            .route("/starting", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    struct Hanging {
        name: &'static str,
        timeout: Duration,
    }

    #[async_trait]
    impl HealthCheck for Hanging {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> HealthCheckResult {
            std::future::pending::<()>().await;
            HealthCheckResult::healthy()
        }

        fn timeout(&self) -> Option<Duration> {
            Some(self.timeout)
        }
    }

    struct Fixed {
        name: &'static str,
        result: HealthCheckResult,
        mandatory: bool,
    }

    #[async_trait]
    impl HealthCheck for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> HealthCheckResult {
            self.result.clone()
        }

        fn is_mandatory(&self) -> bool {
            self.mandatory
        }
    }

    #[test]
    fn test_status_ordering() {
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Unhealthy.worst(HealthStatus::Degraded),
            HealthStatus::Unhealthy
        );
        assert!(HealthStatus::Degraded.is_passing());
        assert!(!HealthStatus::Unhealthy.is_passing());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }

    #[test]
    fn test_dependency_error_mapping() {
        let result = HealthCheckResult::from_error(&DependencyError::Timeout(
            Duration::from_millis(1500),
        ));
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.issues, vec!["timed out after 1500ms".to_string()]);

        let result =
            HealthCheckResult::from_error(&DependencyError::Degraded("slow".to_string()));
        assert_eq!(result.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_tcp_check_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let check = TcpHealthCheck::new("temporal", addr.to_string());
        assert_eq!(check.check().await.status, HealthStatus::Healthy);

        drop(listener);
        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.issues[0].starts_with("unreachable"));
    }

    #[tokio::test]
    async fn test_composite_reports_worst_member() {
        let composite = CompositeHealthCheck::new("databases", Duration::from_secs(1))
            .add_check(Arc::new(Fixed {
                name: "neo4j",
                result: HealthCheckResult::healthy(),
                mandatory: true,
            }))
            .add_check(Arc::new(Fixed {
                name: "weaviate",
                result: HealthCheckResult::unhealthy("connection refused"),
                mandatory: true,
            }));

        let result = composite.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.issues, vec!["weaviate: connection refused".to_string()]);
    }

    #[tokio::test]
    async fn test_composite_optional_member_only_degrades() {
        let composite = CompositeHealthCheck::new("services", Duration::from_secs(1)).add_check(
            Arc::new(Fixed {
                name: "search",
                result: HealthCheckResult::unhealthy("down"),
                mandatory: false,
            }),
        );

        let result = composite.check().await;
        assert_eq!(result.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_http_success_and_auth_are_healthy() {
        let base = serve_statuses().await;

        for path in ["/ready", "/auth", "/forbidden"] {
            let check = HttpHealthCheck::new("weaviate", format!("{}{}", base, path));
            let result = check.check().await;
            assert_eq!(result.status, HealthStatus::Healthy, "{}", path);
            assert!(result.issues.is_empty());
        }
    }

    #[tokio::test]
    async fn test_http_server_error_is_unhealthy() {
        let base = serve_statuses().await;

        for path in ["/starting", "/broken"] {
            let check = HttpHealthCheck::new("weaviate", format!("{}{}", base, path));
            let result = check.check().await;
            assert_eq!(result.status, HealthStatus::Unhealthy, "{}", path);
            assert!(result.issues[0].starts_with("unavailable"));
        }
    }

    #[tokio::test]
    async fn test_http_client_error_is_degraded() {
        let base = serve_statuses().await;

        for path in ["/busy", "/missing"] {
            let check = HttpHealthCheck::new("services", format!("{}{}", base, path));
            let result = check.check().await;
            assert_eq!(result.status, HealthStatus::Degraded, "{}", path);
            assert!(result.issues[0].starts_with("degraded"));
        }
    }

    #[tokio::test]
    async fn test_http_connection_error_is_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let check = HttpHealthCheck::new("services", format!("http://{}/health", addr));
        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.issues[0].starts_with("unreachable"));
    }

    #[tokio::test]
    async fn test_composite_waits_for_slowest_member() {
        let composite = CompositeHealthCheck::new("databases", Duration::from_millis(50))
            .add_check(Arc::new(Fixed {
                name: "neo4j",
                result: HealthCheckResult::unhealthy("connection refused"),
                mandatory: true,
            }))
            .add_check(Arc::new(Hanging {
                name: "weaviate",
                timeout: Duration::from_millis(300),
            }));

        assert_eq!(composite.timeout(), Some(Duration::from_millis(550)));

        let result = run_check(Arc::new(composite), Duration::from_millis(100)).await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(
            result.issues,
            vec![
                "neo4j: connection refused".to_string(),
                "weaviate: timed out after 300ms".to_string(),
            ]
        );
    }
}
