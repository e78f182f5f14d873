//! Provider factory.
//!
//! # Responsibilities
//! - Translate a named, enabled configuration entry into a ready Provider
//! - Guarantee exactly one CircuitBreaker per provider name per process
//! - Offer a breaker-aware connectivity test
//!
//! # Design Decisions
//! - Breaker registry survives configuration reloads and pool resets so
//!   breaker identity (and accumulated stats) is stable per name
//! - Credentials resolve from inline config or an environment variable;
//!   neither present is a construction-time error

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::schema::{CouncilConfig, ProviderConfig};
use crate::provider::client::Provider;
use crate::provider::types::ProviderError;
use crate::resilience::CircuitBreaker;

/// Errors raised while constructing a provider from configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// No provider with this name in the configuration.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The provider exists but is disabled.
    #[error("provider '{0}' is disabled")]
    DisabledProvider(String),

    /// Neither an inline key nor a resolvable environment variable.
    #[error("provider '{name}': missing credentials: {detail}")]
    MissingCredentials { name: String, detail: String },

    /// The endpoint is not a valid URL.
    #[error("provider '{name}': invalid endpoint '{endpoint}'")]
    InvalidEndpoint { name: String, endpoint: String },
}

/// A pooled provider paired with its shared circuit breaker.
#[derive(Debug, Clone)]
pub struct ProviderHandle {
    pub provider: Arc<Provider>,
    pub breaker: Arc<CircuitBreaker>,
}

/// Outcome of a single connectivity test.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Healthy { latency_ms: u64 },
    CircuitOpen { retry_after_secs: u64 },
    Failed { error: String },
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy { .. })
    }
}

/// Builds providers from live configuration and owns the per-name breaker
/// registry.
pub struct ProviderFactory {
    config: ArcSwap<CouncilConfig>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    http: reqwest::Client,
}

impl ProviderFactory {
    pub fn new(config: Arc<CouncilConfig>) -> Self {
        Self {
            config: ArcSwap::new(config),
            breakers: DashMap::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<CouncilConfig> {
        self.config.load_full()
    }

    /// Swap in a reloaded configuration. Existing breakers keep their
    /// identity; new thresholds apply to breakers created after the swap.
    pub fn update_config(&self, config: Arc<CouncilConfig>) {
        self.config.store(config);
    }

    /// Construct a Provider and attach its breaker.
    ///
    /// Calling twice for the same name returns two Provider values but the
    /// same breaker instance; the shared breaker is what makes pooling
    /// meaningful.
    pub fn create_provider(&self, name: &str) -> Result<ProviderHandle, ConfigurationError> {
        let config = self.config.load();
        let entry = config
            .providers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigurationError::UnknownProvider(name.to_string()))?;

        if !entry.enabled {
            return Err(ConfigurationError::DisabledProvider(name.to_string()));
        }

        let api_key = resolve_credentials(entry)?;

        let endpoint = Url::parse(&entry.endpoint).map_err(|_| {
            ConfigurationError::InvalidEndpoint {
                name: name.to_string(),
                endpoint: entry.endpoint.clone(),
            }
        })?;

        // Unknown tags are rejected at config load; stragglers are skipped.
        let roles = entry
            .roles
            .iter()
            .filter_map(|tag| tag.parse().ok())
            .collect();

        let breaker_config = config.breaker.with_overrides(&entry.breaker);
        let breaker = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, &breaker_config)))
            .clone();

        let provider = Provider::new(
            entry.name.clone(),
            endpoint,
            api_key,
            entry.default_model.clone(),
            entry.flavor,
            roles,
            self.http.clone(),
        );

        Ok(ProviderHandle {
            provider: Arc::new(provider),
            breaker,
        })
    }

    /// Test a provider's connectivity through its breaker.
    ///
    /// Short-circuits with [`ProbeOutcome::CircuitOpen`] when the breaker
    /// disallows requests, without touching the provider.
    pub async fn test_provider(
        &self,
        name: &str,
        probe_timeout: Duration,
    ) -> Result<ProbeOutcome, ConfigurationError> {
        let handle = self.create_provider(name)?;
        Ok(probe_handle(&handle, probe_timeout).await)
    }
}

/// Probe one pooled provider through its breaker.
pub(crate) async fn probe_handle(handle: &ProviderHandle, probe_timeout: Duration) -> ProbeOutcome {
    if !handle.breaker.allows_requests() {
        let retry_after_secs = handle
            .breaker
            .status()
            .retry_after_secs
            .unwrap_or_default();
        return ProbeOutcome::CircuitOpen { retry_after_secs };
    }

    let start = Instant::now();
    let outcome = handle
        .breaker
        .execute(|| async {
            match tokio::time::timeout(probe_timeout, handle.provider.probe()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Transport(format!(
                    "probe timed out after {}s",
                    probe_timeout.as_secs()
                ))),
            }
        })
        .await;

    match outcome {
        Ok(()) => ProbeOutcome::Healthy {
            latency_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => ProbeOutcome::Failed {
            error: e.to_string(),
        },
    }
}

fn resolve_credentials(entry: &ProviderConfig) -> Result<String, ConfigurationError> {
    if let Some(key) = entry.api_key.as_deref() {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    if let Some(var) = entry.api_key_env.as_deref() {
        return std::env::var(var).map_err(|_| ConfigurationError::MissingCredentials {
            name: entry.name.clone(),
            detail: format!("environment variable '{}' not set", var),
        });
    }
    Err(ConfigurationError::MissingCredentials {
        name: entry.name.clone(),
        detail: "set api_key or api_key_env".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(providers: Vec<ProviderConfig>) -> Arc<CouncilConfig> {
        Arc::new(CouncilConfig {
            providers,
            ..Default::default()
        })
    }

    fn provider_entry(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            enabled: true,
            endpoint: "https://api.example.com".to_string(),
            api_key: Some("sk-test".to_string()),
            api_key_env: None,
            default_model: "test-model".to_string(),
            flavor: Default::default(),
            roles: vec!["content".to_string()],
            breaker: Default::default(),
        }
    }

    #[test]
    fn test_breaker_identity_is_stable() {
        let factory = ProviderFactory::new(config_with(vec![provider_entry("a")]));

        let first = factory.create_provider("a").unwrap();
        let second = factory.create_provider("a").unwrap();

        assert!(
            Arc::ptr_eq(&first.breaker, &second.breaker),
            "same name must share one breaker"
        );
        assert!(!Arc::ptr_eq(&first.provider, &second.provider));
    }

    #[test]
    fn test_unknown_provider() {
        let factory = ProviderFactory::new(config_with(vec![]));
        assert!(matches!(
            factory.create_provider("ghost"),
            Err(ConfigurationError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_disabled_provider() {
        let mut entry = provider_entry("a");
        entry.enabled = false;
        let factory = ProviderFactory::new(config_with(vec![entry]));
        assert!(matches!(
            factory.create_provider("a"),
            Err(ConfigurationError::DisabledProvider(_))
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let mut entry = provider_entry("a");
        entry.api_key = None;
        entry.api_key_env = Some("SWARM_TEST_NO_SUCH_VAR".to_string());
        let factory = ProviderFactory::new(config_with(vec![entry]));
        assert!(matches!(
            factory.create_provider("a"),
            Err(ConfigurationError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn test_breaker_survives_config_update() {
        let factory = ProviderFactory::new(config_with(vec![provider_entry("a")]));
        let before = factory.create_provider("a").unwrap();

        factory.update_config(config_with(vec![provider_entry("a")]));
        let after = factory.create_provider("a").unwrap();

        assert!(Arc::ptr_eq(&before.breaker, &after.breaker));
    }
}
