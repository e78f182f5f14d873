//! Active health checking.
//!
//! # Responsibilities
//! - Periodically re-probe admitted providers
//! - Update pool health bookkeeping from the results

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::pool::registry::ProviderPool;

pub struct HealthMonitor {
    pool: Arc<ProviderPool>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ProviderPool>, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);
        // The first tick fires immediately; initialization already probed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.pool.perform_health_checks().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
