//! Pool admission, reset, and health check integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use swarm_council::config::schema::{CouncilConfig, HealthCheckConfig, ProviderConfig};
use swarm_council::council::Role;
use swarm_council::pool::{ProviderPool, ProviderStatus};
use swarm_council::provider::CompletionRequest;

mod common;

fn provider_entry(name: &str, addr: SocketAddr, roles: &[&str]) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        enabled: true,
        endpoint: format!("http://{}", addr),
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
            enabled: false,
            interval_secs: 60,
            timeout_secs: 2,
        },
        ..Default::default()
    })
}

#[tokio::test]
async fn test_failed_admission_until_reset() {
    let addr: SocketAddr = "127.0.0.1:38581".parse().unwrap();

    // No server yet: admission probe fails.
    let pool = ProviderPool::new(pool_config(vec![provider_entry(
        "late",
        addr,
        &["content"],
    )]));
    pool.initialize().await;

    assert!(pool.get_provider("late").is_none());
    assert!(pool.get_providers_by_role(Role::Content).is_empty());

    // The provider comes up; membership only changes on reset.
    common::start_healthy_provider(addr, "hello").await;
    assert!(pool.get_provider("late").is_none());

    pool.reset().await;

    assert!(pool.get_provider("late").is_some());
    assert_eq!(pool.get_providers_by_role(Role::Content).len(), 1);
    let status = pool.get_status();
    assert_eq!(status.providers[0].status, ProviderStatus::Ready);
}

#[tokio::test]
async fn test_role_lookup_preserves_config_order() {
    let a_addr: SocketAddr = "127.0.0.1:38681".parse().unwrap();
    let b_addr: SocketAddr = "127.0.0.1:38682".parse().unwrap();
    common::start_healthy_provider(a_addr, "a").await;
    common::start_healthy_provider(b_addr, "b").await;

    let pool = ProviderPool::new(pool_config(vec![
        provider_entry("first", a_addr, &["content"]),
        provider_entry("second", b_addr, &["content"]),
    ]));
    pool.initialize().await;

    let candidates = pool.get_providers_by_role(Role::Content);
    let names: Vec<&str> = candidates
        .iter()
        .map(|(h, _)| h.provider.name())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_direct_provider_completion() {
    let addr: SocketAddr = "127.0.0.1:38781".parse().unwrap();
    common::start_healthy_provider(addr, "Direct completion text.").await;

    let pool = ProviderPool::new(pool_config(vec![provider_entry(
        "solo",
        addr,
        &["content"],
    )]));
    pool.initialize().await;

    let handle = pool.get_provider("solo").expect("admitted provider");
    let request = CompletionRequest {
        system: None,
        prompt: "improve this".to_string(),
        model: None,
        max_tokens: 256,
        temperature: 0.2,
    };

    let completion = handle
        .breaker
        .execute(|| handle.provider.complete(&request))
        .await
        .expect("completion succeeds");

    assert_eq!(completion.text, "Direct completion text.");
    assert_eq!(completion.provider, "solo");
    assert_eq!(handle.breaker.status().successes, 1);
}

#[tokio::test]
async fn test_health_checks_update_without_evicting() {
    let addr: SocketAddr = "127.0.0.1:38881".parse().unwrap();
    common::start_healthy_provider(addr, "ok").await;

    let pool = ProviderPool::new(pool_config(vec![provider_entry(
        "steady",
        addr,
        &["content"],
    )]));
    pool.initialize().await;

    let before = pool.get_status().providers[0].clone();
    pool.perform_health_checks().await;
    let after = pool.get_status().providers[0].clone();

    assert_eq!(after.status, ProviderStatus::Ready);
    assert!(after.last_check.as_ref().unwrap().is_healthy());
    assert!(after.last_checked_at >= before.last_checked_at);
}

#[tokio::test]
async fn test_concurrent_initialize_single_pass() {
    let addr: SocketAddr = "127.0.0.1:38981".parse().unwrap();
    common::start_healthy_provider(addr, "ok").await;

    let pool = Arc::new(ProviderPool::new(pool_config(vec![provider_entry(
        "shared",
        addr,
        &["content"],
    )])));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let p = pool.clone();
        handles.push(tokio::spawn(async move { p.initialize().await }));
    }
    for h in handles {
        h.await.unwrap();
    }

    // Exactly one pass ran, so the shared breaker saw exactly one probe.
    let breaker = pool.get_provider("shared").unwrap().breaker;
    assert_eq!(breaker.status().attempts, 1);
}
