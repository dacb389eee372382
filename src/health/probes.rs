use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use super::checks::{HealthCheck, HealthStatus};
use super::runner::{aggregate_status, mandatory_passing, run_checks, CheckSnapshot};
use super::system::SystemIdentity;
use crate::metrics;

#[derive(Debug, Clone, Serialize)]
pub struct StartupResponse {
    pub started: bool,
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub system: SystemIdentity,
    pub checks: CheckSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: CheckSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessResponse {
    pub alive: bool,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_age_ms: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Liveness probe - reflects only process-internal viability.
///
/// A heartbeat task on the runtime stamps `last_heartbeat_ms`; a stale stamp
/// means the runtime is starved. Staleness is only judged once the first
/// beat has landed. No dependency is ever consulted.
const NO_HEARTBEAT: u64 = u64::MAX;

pub struct LivenessProbe {
    booted_at: Instant,
    last_heartbeat_ms: AtomicU64,
    stall_threshold: Duration,
    fault: RwLock<Option<String>>,
}

impl LivenessProbe {
    pub fn new(stall_threshold: Duration) -> Self {
        Self {
            booted_at: Instant::now(),
            last_heartbeat_ms: AtomicU64::new(NO_HEARTBEAT),
            stall_threshold,
            fault: RwLock::new(None),
        }
    }

    /// Record that the runtime is making progress
    pub fn beat(&self) {
        let now = self.booted_at.elapsed().as_millis() as u64;
        self.last_heartbeat_ms.store(now, Ordering::Release);
    }

    /// Record an unrecoverable internal fault; liveness reports false from now on
    pub async fn mark_fault(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!("Process internal fault recorded: {}", reason);
        let mut fault = self.fault.write().await;
        fault.get_or_insert(reason);
    }

    pub async fn probe(&self) -> LivenessResponse {
        let elapsed = self.booted_at.elapsed();
        let heartbeat_age_ms = match self.last_heartbeat_ms.load(Ordering::Acquire) {
            NO_HEARTBEAT => None,
            last => Some((elapsed.as_millis() as u64).saturating_sub(last)),
        };

        let mut issues = Vec::new();

        if let Some(age) = heartbeat_age_ms {
            if age > self.stall_threshold.as_millis() as u64 {
                issues.push(format!("heartbeat stalled for {}ms", age));
            }
        }

        if let Some(fault) = self.fault.read().await.as_ref() {
            issues.push(format!("internal fault: {}", fault));
        }

        LivenessResponse {
            alive: issues.is_empty(),
            timestamp: Utc::now(),
            uptime_seconds: elapsed.as_secs(),
            heartbeat_age_ms,
            issues,
        }
    }

    /// Start the heartbeat task
    pub fn spawn_heartbeat(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let probe = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                probe.beat();
            }
        })
    }
}

/// Readiness probe - checks if the application is ready to serve traffic
pub struct ReadinessProbe {
    checks: Vec<Arc<dyn HealthCheck>>,
    check_timeout: Duration,
    cache_ttl: Duration,
    cache: RwLock<Option<(Instant, CheckSnapshot)>>,
    refresh: Mutex<()>,
}

impl ReadinessProbe {
    pub fn new(check_timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            checks: vec![],
            check_timeout,
            cache_ttl,
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn add_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub async fn probe(&self) -> ReadinessResponse {
        let checks = self.snapshot().await;
        let ready = mandatory_passing(&checks);

        ReadinessResponse {
            ready,
            status: aggregate_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }

    /// Fresh results, or ones shared with a concurrent request within the TTL
    async fn snapshot(&self) -> CheckSnapshot {
        if self.cache_ttl.is_zero() {
            return run_checks(&self.checks, self.check_timeout).await;
        }

        if let Some(snapshot) = self.cached().await {
            return snapshot;
        }

        // Only one request refreshes; the others wait and reuse its result
        let _guard = self.refresh.lock().await;
        if let Some(snapshot) = self.cached().await {
            return snapshot;
        }

        let snapshot = run_checks(&self.checks, self.check_timeout).await;
        *self.cache.write().await = Some((Instant::now(), snapshot.clone()));
        snapshot
    }

    async fn cached(&self) -> Option<CheckSnapshot> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|(at, _)| at.elapsed() < self.cache_ttl)
            .map(|(_, snapshot)| snapshot.clone())
    }
}

/// Startup probe - one-shot gate that opens once every mandatory dependency
/// has been reachable at least once
pub struct StartupProbe {
    checks: Vec<Arc<dyn HealthCheck>>,
    check_timeout: Duration,
    system: SystemIdentity,
    started: AtomicBool,
}

impl StartupProbe {
    pub fn new(system: SystemIdentity, check_timeout: Duration) -> Self {
        Self {
            checks: vec![],
            check_timeout,
            system,
            started: AtomicBool::new(false),
        }
    }

    pub fn add_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub async fn probe(&self) -> StartupResponse {
        let checks = run_checks(&self.checks, self.check_timeout).await;

        if mandatory_passing(&checks) {
            self.mark_started();
        }

        StartupResponse {
            started: self.is_started(),
            status: aggregate_status(&checks),
            timestamp: Utc::now(),
            system: self.system.clone(),
            checks,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn mark_started(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            metrics::record_started();
            info!("Application startup complete - all mandatory checks passed");
        }
    }

    /// Poll mandatory checks until the gate opens, so startup completes even
    /// when no orchestrator is polling
    pub fn spawn_watch(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let probe = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            while !probe.is_started() {
                ticker.tick().await;
                let response = probe.probe().await;
                if !response.started {
                    let failing: Vec<&str> = response
                        .checks
                        .iter()
                        .filter(|(_, check)| check.mandatory && !check.status.is_passing())
                        .map(|(name, _)| name.as_str())
                        .collect();
                    debug!("Waiting for mandatory dependencies: {:?}", failing);
                }
            }
        })
    }
}

/// Health probe manager
pub struct HealthProbeManager {
    liveness: Arc<LivenessProbe>,
    readiness: Arc<ReadinessProbe>,
    startup: Arc<StartupProbe>,
    not_ready_status: StatusCode,
}

impl HealthProbeManager {
    pub fn new(liveness: LivenessProbe, readiness: ReadinessProbe, startup: StartupProbe) -> Self {
        Self {
            liveness: Arc::new(liveness),
            readiness: Arc::new(readiness),
            startup: Arc::new(startup),
            not_ready_status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Status code sent with a `ready: false` body
    pub fn with_not_ready_status(mut self, status: StatusCode) -> Self {
        self.not_ready_status = status;
        self
    }

    pub fn not_ready_status(&self) -> StatusCode {
        self.not_ready_status
    }

    pub async fn liveness(&self) -> LivenessResponse {
        self.liveness.probe().await
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        self.readiness.probe().await
    }

    pub async fn startup(&self) -> StartupResponse {
        self.startup.probe().await
    }

    pub fn is_started(&self) -> bool {
        self.startup.is_started()
    }

    pub async fn mark_fault(&self, reason: impl Into<String>) {
        self.liveness.mark_fault(reason).await;
    }

    /// Start the liveness heartbeat and, if enabled, the startup watcher
    pub fn start_background_tasks(
        &self,
        heartbeat_interval: Duration,
        startup_poll_interval: Option<Duration>,
    ) -> Vec<JoinHandle<()>> {
        info!(
            "Starting liveness heartbeat (interval: {}ms)",
            heartbeat_interval.as_millis()
        );
        let mut handles = vec![self.liveness.spawn_heartbeat(heartbeat_interval)];

        match startup_poll_interval {
            Some(period) => {
                info!("Starting startup watcher (interval: {}s)", period.as_secs());
                handles.push(self.startup.spawn_watch(period));
            }
            None => warn!("Startup watcher disabled; startup completes on first passing probe"),
        }

        handles
    }
}
