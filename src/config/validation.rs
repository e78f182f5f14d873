//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check provider uniqueness and endpoint well-formedness
//! - Validate role tags against the typed role set
//! - Validate value ranges (thresholds > 0, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CouncilConfig -> Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::CouncilConfig;
use crate::council::roles::Role;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate provider name '{0}'")]
    DuplicateProvider(String),

    #[error("provider '{name}': invalid endpoint '{endpoint}'")]
    InvalidEndpoint { name: String, endpoint: String },

    #[error("provider '{name}': unknown role tag '{tag}'")]
    UnknownRole { name: String, tag: String },

    #[error("provider '{name}': no credentials (set api_key or api_key_env)")]
    MissingCredentials { name: String },

    #[error("provider '{name}': default_model must not be empty")]
    EmptyModel { name: String },

    #[error("breaker: {0} must be greater than zero")]
    ZeroBreakerValue(&'static str),

    #[error("health_check: interval_secs must be greater than zero")]
    ZeroHealthInterval,

    #[error("no enabled provider fills the '{0}' role")]
    UncoveredCriticalRole(Role),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &CouncilConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut covered_roles = HashSet::new();

    for provider in &config.providers {
        if !seen.insert(provider.name.clone()) {
            errors.push(ValidationError::DuplicateProvider(provider.name.clone()));
        }

        if Url::parse(&provider.endpoint).is_err() {
            errors.push(ValidationError::InvalidEndpoint {
                name: provider.name.clone(),
                endpoint: provider.endpoint.clone(),
            });
        }

        if provider.default_model.is_empty() {
            errors.push(ValidationError::EmptyModel {
                name: provider.name.clone(),
            });
        }

        if provider.api_key.is_none() && provider.api_key_env.is_none() {
            errors.push(ValidationError::MissingCredentials {
                name: provider.name.clone(),
            });
        }

        for tag in &provider.roles {
            match tag.parse::<Role>() {
                Ok(role) => {
                    if provider.enabled {
                        covered_roles.insert(role);
                    }
                }
                Err(_) => errors.push(ValidationError::UnknownRole {
                    name: provider.name.clone(),
                    tag: tag.clone(),
                }),
            }
        }
    }

    let breaker = &config.breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroBreakerValue("failure_threshold"));
    }
    if breaker.success_threshold == 0 {
        errors.push(ValidationError::ZeroBreakerValue("success_threshold"));
    }
    if breaker.call_timeout_secs == 0 {
        errors.push(ValidationError::ZeroBreakerValue("call_timeout_secs"));
    }
    if breaker.reset_timeout_secs == 0 {
        errors.push(ValidationError::ZeroBreakerValue("reset_timeout_secs"));
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroHealthInterval);
    }

    // A config with providers but no primary content coverage is a footgun:
    // every council task would fall back to unoptimized input.
    if !config.providers.is_empty() {
        for role in Role::all().iter().filter(|r| r.is_critical()) {
            if !covered_roles.contains(role) {
                errors.push(ValidationError::UncoveredCriticalRole(*role));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProviderConfig;

    fn provider(name: &str, roles: &[&str]) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            enabled: true,
            endpoint: "https://api.example.com".to_string(),
            api_key: Some("sk-test".to_string()),
            api_key_env: None,
            default_model: "test-model".to_string(),
            flavor: Default::default(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            breaker: Default::default(),
        }
    }

    #[test]
    fn test_empty_config_valid() {
        assert!(validate_config(&CouncilConfig::default()).is_ok());
    }

    #[test]
    fn test_valid_config() {
        let mut config = CouncilConfig::default();
        config.providers.push(provider("a", &["content", "seo-review"]));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = CouncilConfig::default();
        let mut bad = provider("a", &["content", "astrology"]);
        bad.endpoint = "not a url".to_string();
        bad.api_key = None;
        config.providers.push(bad);
        config.providers.push(provider("a", &["content"]));
        config.breaker.failure_threshold = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 4, "expected several errors, got {errors:?}");
        assert!(errors.contains(&ValidationError::DuplicateProvider("a".into())));
        assert!(errors.contains(&ValidationError::UnknownRole {
            name: "a".into(),
            tag: "astrology".into(),
        }));
    }

    #[test]
    fn test_uncovered_critical_role() {
        let mut config = CouncilConfig::default();
        config.providers.push(provider("a", &["seo-review"]));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UncoveredCriticalRole(_))));
    }
}
