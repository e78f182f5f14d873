//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the council
//! service. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

/// Root configuration for the council service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CouncilConfig {
    /// External completion provider definitions.
    pub providers: Vec<ProviderConfig>,

    /// Default circuit breaker settings (per-provider overrides allowed).
    pub breaker: BreakerConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Orchestrator settings.
    pub orchestrator: OrchestratorConfig,

    /// Quality scoring settings.
    pub scoring: ScoringConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Which completion API dialect a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// OpenAI-compatible chat completions (`/v1/chat/completions`).
    OpenAi,
    /// Anthropic-compatible messages API (`/v1/messages`).
    Anthropic,
    /// Google-compatible generateContent API.
    Google,
}

impl Default for ApiFlavor {
    fn default() -> Self {
        ApiFlavor::OpenAi
    }
}

/// A single external completion provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Unique provider identifier (e.g. "chinda").
    pub name: String,

    /// Whether this provider participates in the pool.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Base endpoint URL (e.g. "https://api.example.com").
    pub endpoint: String,

    /// API key, inline. Prefer `api_key_env` outside of tests.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable to read the API key from.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Model used when a call does not specify one.
    pub default_model: String,

    /// API dialect the endpoint speaks.
    #[serde(default)]
    pub flavor: ApiFlavor,

    /// Council roles this provider can fill (e.g. "content", "seo-review").
    #[serde(default)]
    pub roles: Vec<String>,

    /// Per-provider circuit breaker overrides.
    #[serde(default)]
    pub breaker: BreakerOverrides,
}

fn default_enabled() -> bool {
    true
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Failure count that opens the circuit.
    pub failure_threshold: u32,

    /// Successes required in half-open state to close the circuit.
    pub success_threshold: u32,

    /// Per-call timeout in seconds.
    pub call_timeout_secs: u64,

    /// Cooldown before an open circuit admits a probe call, in seconds.
    pub reset_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            call_timeout_secs: 60,
            reset_timeout_secs: 300,
        }
    }
}

/// Optional per-provider breaker overrides; unset fields fall back to the
/// global [`BreakerConfig`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerOverrides {
    pub failure_threshold: Option<u32>,
    pub success_threshold: Option<u32>,
    pub call_timeout_secs: Option<u64>,
    pub reset_timeout_secs: Option<u64>,
}

impl BreakerConfig {
    /// Apply per-provider overrides on top of the global defaults.
    pub fn with_overrides(&self, overrides: &BreakerOverrides) -> Self {
        Self {
            failure_threshold: overrides.failure_threshold.unwrap_or(self.failure_threshold),
            success_threshold: overrides.success_threshold.unwrap_or(self.success_threshold),
            call_timeout_secs: overrides.call_timeout_secs.unwrap_or(self.call_timeout_secs),
            reset_timeout_secs: overrides
                .reset_timeout_secs
                .unwrap_or(self.reset_timeout_secs),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic health monitor.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            timeout_secs: 10,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum candidates tried per role before the role is recorded as
    /// unfilled.
    pub max_candidates_per_role: usize,

    /// Maximum tokens requested from providers per role call.
    pub max_tokens: u32,

    /// Sampling temperature for provider calls.
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_candidates_per_role: 3,
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

/// Quality scoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Lower bound of the target word count range.
    pub target_words_min: usize,

    /// Upper bound of the target word count range.
    pub target_words_max: usize,

    /// Points subtracted for each unfilled critical role.
    pub missing_critical_penalty: u8,

    /// Points subtracted for each unfilled non-critical role.
    pub missing_role_penalty: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            target_words_min: 300,
            target_words_max: 2500,
            missing_critical_penalty: 30,
            missing_role_penalty: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin/status API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin/status API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_defaults() {
        let b = BreakerConfig::default();
        assert_eq!(b.failure_threshold, 5);
        assert_eq!(b.success_threshold, 3);
        assert_eq!(b.call_timeout_secs, 60);
        assert_eq!(b.reset_timeout_secs, 300);
    }

    #[test]
    fn test_breaker_overrides() {
        let base = BreakerConfig::default();
        let overrides = BreakerOverrides {
            failure_threshold: Some(2),
            reset_timeout_secs: Some(30),
            ..Default::default()
        };
        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.failure_threshold, 2);
        assert_eq!(merged.reset_timeout_secs, 30);
        assert_eq!(merged.success_threshold, 3);
        assert_eq!(merged.call_timeout_secs, 60);
    }

    #[test]
    fn test_minimal_provider_toml() {
        let toml = r#"
            [[providers]]
            name = "chinda"
            endpoint = "https://api.chinda.example"
            default_model = "chinda-large"
            roles = ["content", "seo-review"]
        "#;
        let config: CouncilConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.providers.len(), 1);
        let p = &config.providers[0];
        assert!(p.enabled);
        assert_eq!(p.flavor, ApiFlavor::OpenAi);
        assert_eq!(p.roles, vec!["content", "seo-review"]);
    }
}
