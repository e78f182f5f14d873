//! Swarm Council service.
//!
//! AI provider resilience and orchestration for the CMS backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────┐
//!                  │                  SWARM COUNCIL                      │
//!                  │                                                     │
//!   Content task   │  ┌────────────┐    ┌──────────────┐                │
//!   ───────────────┼─▶│ orchestrator│──▶│ provider pool │                │
//!                  │  └─────┬──────┘    └──────┬───────┘                │
//!                  │        │ per role          │ per provider           │
//!                  │        ▼                   ▼                        │
//!                  │  ┌────────────┐    ┌──────────────┐                │
//!   CouncilResult  │  │ aggregation │◀──│circuit breaker│◀───────────────┼──── Provider
//!   ◀──────────────┼──│  + scoring  │    │ + completion │                │     APIs
//!                  │  └────────────┘    └──────────────┘                │
//!                  │                                                     │
//!                  │  ┌────────────────────────────────────────────────┐│
//!                  │  │   config · health checks · metrics · admin API ││
//!                  │  └────────────────────────────────────────────────┘│
//!                  └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::net::TcpListener;

use swarm_council::admin::handlers::AdminState;
use swarm_council::admin::setup_admin_router;
use swarm_council::config::loader::load_config;
use swarm_council::config::watcher::ConfigWatcher;
use swarm_council::config::CouncilConfig;
use swarm_council::council::CouncilOrchestrator;
use swarm_council::lifecycle::shutdown::wait_for_signal;
use swarm_council::lifecycle::Shutdown;
use swarm_council::observability::{logging, metrics};
use swarm_council::pool::{HealthMonitor, ProviderPool};

#[derive(Parser)]
#[command(
    name = "swarm-council",
    about = "AI provider resilience and council orchestration service"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "council.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        CouncilConfig::default()
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("swarm-council v0.1.0 starting");

    if !args.config.exists() {
        tracing::warn!(path = ?args.config, "Config file not found, using defaults");
    }

    tracing::info!(
        providers = config.providers.len(),
        health_check_interval = config.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let config = Arc::new(config);
    let pool = Arc::new(ProviderPool::new(config.clone()));
    pool.initialize().await;

    let orchestrator = Arc::new(CouncilOrchestrator::new(
        pool.clone(),
        config.orchestrator.clone(),
        config.scoring.clone(),
    ));

    let shutdown = Shutdown::new();

    // Periodic health checks
    let monitor = HealthMonitor::new(pool.clone(), config.health_check.clone());
    let monitor_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        monitor.run(monitor_shutdown).await;
    });

    // Config hot reload: swap config, reset pool
    let _watcher = if args.config.exists() {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config);
        let handle = watcher.run()?;
        let reload_pool = pool.clone();
        tokio::spawn(async move {
            while let Some(new_config) = updates.recv().await {
                tracing::info!("Applying reloaded configuration");
                reload_pool.update_config(Arc::new(new_config));
                reload_pool.reset().await;
            }
        });
        Some(handle)
    } else {
        None
    };

    // Admin/status API
    if config.admin.enabled {
        let state = AdminState {
            pool: pool.clone(),
            orchestrator: orchestrator.clone(),
            api_key: config.admin.api_key.clone(),
            started_at: Instant::now(),
        };
        let router = setup_admin_router(state);
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");

        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = admin_shutdown.recv().await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "Admin API server error");
            }
        });
    }

    wait_for_signal().await;
    tracing::info!("Shutdown signal received");

    shutdown.trigger();
    pool.drain().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
