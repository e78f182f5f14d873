//! Provider pool management.
//!
//! # Responsibilities
//! - Own the single shared set of live Provider instances
//! - Admit providers only after a successful initial health probe
//! - Expose lookup by name and by council role
//! - Track per-provider health without evicting on transient failures
//!
//! # Design Decisions
//! - Initialization is single-flight: concurrent callers await the one
//!   in-flight run instead of duplicating provider construction
//! - Admission failures exclude a provider from lookups until reset();
//!   after admission, breaker state (not pool membership) governs use
//! - The pool is an owned, injected instance, not a global singleton

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::schema::CouncilConfig;
use crate::council::roles::Role;
use crate::observability::metrics;
use crate::provider::factory::{probe_handle, ProbeOutcome, ProviderFactory, ProviderHandle};
use crate::resilience::{BreakerState, BreakerStatus};

/// Admission status of a pooled provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Admitted; available to lookups.
    Ready,
    /// Construction or admission probe failed; hidden until reset().
    Failed,
}

/// Association of a provider with its breaker and health bookkeeping.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    /// `None` when the provider could not even be constructed.
    pub handle: Option<ProviderHandle>,
    pub status: ProviderStatus,
    pub last_check: Option<ProbeOutcome>,
    /// Unix seconds of the most recent probe.
    pub last_checked_at: Option<u64>,
}

/// Read-only pool snapshot for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub providers: Vec<ProviderView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderView {
    pub name: String,
    pub status: ProviderStatus,
    pub roles: Vec<Role>,
    pub breaker: Option<BreakerStatus>,
    pub last_check: Option<ProbeOutcome>,
    pub last_checked_at: Option<u64>,
}

/// Process-wide registry of live, health-checked providers.
pub struct ProviderPool {
    factory: ProviderFactory,
    entries: DashMap<String, PoolEntry>,
    /// Configuration order of enabled providers; lookups preserve it.
    order: Mutex<Vec<String>>,
    /// Guards initialization. `true` once a pass has completed; concurrent
    /// callers block on the lock and then observe the completed pass.
    init: AsyncMutex<bool>,
}

impl ProviderPool {
    pub fn new(config: Arc<CouncilConfig>) -> Self {
        Self {
            factory: ProviderFactory::new(config),
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
            init: AsyncMutex::new(false),
        }
    }

    /// Access the factory (breaker registry, config snapshot).
    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    /// Swap in a reloaded configuration. Takes effect at the next reset.
    pub fn update_config(&self, config: Arc<CouncilConfig>) {
        self.factory.update_config(config);
    }

    /// Build every enabled provider concurrently and admit those whose
    /// initial probe succeeds.
    ///
    /// Safe to call from many tasks: only the first runs the pass, the rest
    /// wait for it and return.
    pub async fn initialize(&self) {
        let mut initialized = self.init.lock().await;
        if *initialized {
            return;
        }
        self.run_initialization().await;
        *initialized = true;
    }

    /// Tear down and re-run initialization. Used after configuration
    /// changes or to clear a pool poisoned by repeated failures.
    pub async fn reset(&self) {
        let mut initialized = self.init.lock().await;
        tracing::info!("Resetting provider pool");

        let handles: Vec<ProviderHandle> = self
            .entries
            .iter()
            .filter_map(|e| e.value().handle.clone())
            .collect();
        for handle in &handles {
            handle.breaker.drain().await;
        }
        // A poisoned pool usually means open breakers; a reset is an
        // explicit operator action, so clear them as well.
        for handle in &handles {
            handle.breaker.reset();
        }

        self.entries.clear();
        self.order.lock().expect("pool order mutex poisoned").clear();

        self.run_initialization().await;
        *initialized = true;
    }

    /// Wait for in-flight provider calls to settle. Used at shutdown.
    pub async fn drain(&self) {
        let handles: Vec<ProviderHandle> = self
            .entries
            .iter()
            .filter_map(|e| e.value().handle.clone())
            .collect();
        for handle in handles {
            handle.breaker.drain().await;
        }
    }

    async fn run_initialization(&self) {
        let config = self.factory.config();
        let probe_timeout = Duration::from_secs(config.health_check.timeout_secs);

        let names: Vec<String> = config
            .providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.clone())
            .collect();

        // Fire all constructions and probes concurrently; one provider's
        // failure never blocks the others.
        let probes = names.iter().map(|name| async {
            match self.factory.create_provider(name) {
                Ok(handle) => {
                    let outcome = probe_handle(&handle, probe_timeout).await;
                    (name.clone(), Some(handle), outcome)
                }
                Err(e) => (
                    name.clone(),
                    None,
                    ProbeOutcome::Failed {
                        error: e.to_string(),
                    },
                ),
            }
        });
        let results = join_all(probes).await;

        self.entries.clear();
        let now = unix_now();
        let mut order = Vec::with_capacity(results.len());
        let mut admitted = 0usize;
        let mut failed = 0usize;

        for (name, handle, outcome) in results {
            let healthy = outcome.is_healthy();
            metrics::record_provider_health(&name, healthy);
            if healthy {
                admitted += 1;
                tracing::info!(provider = %name, "Provider admitted to pool");
            } else {
                failed += 1;
                tracing::warn!(provider = %name, outcome = ?outcome, "Provider failed admission");
            }

            self.entries.insert(
                name.clone(),
                PoolEntry {
                    handle,
                    status: if healthy {
                        ProviderStatus::Ready
                    } else {
                        ProviderStatus::Failed
                    },
                    last_check: Some(outcome),
                    last_checked_at: Some(now),
                },
            );
            order.push(name);
        }

        *self.order.lock().expect("pool order mutex poisoned") = order;
        metrics::record_pool_size(admitted, failed);
        tracing::info!(admitted, failed, "Provider pool initialized");
    }

    /// Look up a ready provider by name.
    ///
    /// Absence means "this capability is currently unavailable", not an
    /// error: callers degrade instead of failing.
    pub fn get_provider(&self, name: &str) -> Option<ProviderHandle> {
        self.entries.get(name).and_then(|entry| {
            if entry.status == ProviderStatus::Ready {
                entry.handle.clone()
            } else {
                None
            }
        })
    }

    /// All ready providers tagged for `role`, in configuration order, each
    /// paired with its current breaker state.
    pub fn get_providers_by_role(&self, role: Role) -> Vec<(ProviderHandle, BreakerState)> {
        let order = self
            .order
            .lock()
            .expect("pool order mutex poisoned")
            .clone();

        let mut candidates = Vec::new();
        for name in order {
            if let Some(handle) = self.get_provider(&name) {
                if handle.provider.fills(role) {
                    let state = handle.breaker.status().state;
                    candidates.push((handle, state));
                }
            }
        }
        candidates
    }

    /// Re-probe every admitted provider concurrently and update health
    /// bookkeeping. Never evicts: breaker state governs use.
    pub async fn perform_health_checks(&self) {
        let config = self.factory.config();
        let probe_timeout = Duration::from_secs(config.health_check.timeout_secs);

        let targets: Vec<(String, ProviderHandle)> = self
            .entries
            .iter()
            .filter(|e| e.value().status == ProviderStatus::Ready)
            .filter_map(|e| e.value().handle.clone().map(|h| (e.key().clone(), h)))
            .collect();

        let checks = targets.iter().map(|(name, handle)| async {
            let outcome = probe_handle(handle, probe_timeout).await;
            (name.clone(), outcome)
        });
        let results = join_all(checks).await;

        let now = unix_now();
        for (name, outcome) in results {
            let healthy = outcome.is_healthy();
            metrics::record_provider_health(&name, healthy);
            if !healthy {
                tracing::warn!(provider = %name, outcome = ?outcome, "Health check failed");
            }
            if let Some(mut entry) = self.entries.get_mut(&name) {
                entry.last_check = Some(outcome);
                entry.last_checked_at = Some(now);
            }
        }
    }

    /// Per-provider health and breaker snapshot, in configuration order.
    pub fn get_status(&self) -> PoolStatus {
        let order = self
            .order
            .lock()
            .expect("pool order mutex poisoned")
            .clone();

        let providers = order
            .into_iter()
            .filter_map(|name| {
                self.entries.get(&name).map(|entry| ProviderView {
                    name: name.clone(),
                    status: entry.status,
                    roles: entry
                        .handle
                        .as_ref()
                        .map(|h| h.provider.roles().to_vec())
                        .unwrap_or_default(),
                    breaker: entry.handle.as_ref().map(|h| h.breaker.status()),
                    last_check: entry.last_check.clone(),
                    last_checked_at: entry.last_checked_at,
                })
            })
            .collect();

        PoolStatus { providers }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HealthCheckConfig, ProviderConfig};

    // Port 9 (discard) refuses immediately on loopback; probes fail fast.
    fn unreachable_provider(name: &str, roles: &[&str]) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            enabled: true,
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: Some("sk-test".to_string()),
            api_key_env: None,
            default_model: "test-model".to_string(),
            flavor: Default::default(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            breaker: Default::default(),
        }
    }

    fn pool_config(providers: Vec<ProviderConfig>) -> Arc<CouncilConfig> {
        Arc::new(CouncilConfig {
            providers,
            health_check: HealthCheckConfig {
                enabled: true,
                interval_secs: 60,
                timeout_secs: 1,
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_failed_admission_excluded_from_lookups() {
        let pool = ProviderPool::new(pool_config(vec![unreachable_provider(
            "dead",
            &["content"],
        )]));
        pool.initialize().await;

        assert!(pool.get_provider("dead").is_none());
        assert!(pool.get_providers_by_role(Role::Content).is_empty());

        let status = pool.get_status();
        assert_eq!(status.providers.len(), 1);
        assert_eq!(status.providers[0].status, ProviderStatus::Failed);
    }

    #[tokio::test]
    async fn test_construction_failure_recorded() {
        let mut entry = unreachable_provider("nocreds", &["content"]);
        entry.api_key = None;
        let pool = ProviderPool::new(pool_config(vec![entry]));
        pool.initialize().await;

        let status = pool.get_status();
        assert_eq!(status.providers[0].status, ProviderStatus::Failed);
        assert!(status.providers[0].breaker.is_none());
    }

    #[tokio::test]
    async fn test_initialize_is_single_flight() {
        let pool = Arc::new(ProviderPool::new(pool_config(vec![unreachable_provider(
            "dead",
            &["content"],
        )])));

        let a = pool.clone();
        let b = pool.clone();
        tokio::join!(
            async move { a.initialize().await },
            async move { b.initialize().await }
        );

        // One pass means the admission probe ran exactly once against the
        // provider's breaker.
        let breaker = pool.factory().create_provider("dead").unwrap().breaker;
        assert_eq!(breaker.status().attempts, 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_none() {
        let pool = ProviderPool::new(pool_config(vec![]));
        pool.initialize().await;
        assert!(pool.get_provider("ghost").is_none());
    }
}
