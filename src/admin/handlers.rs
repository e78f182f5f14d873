use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::council::{CouncilOrchestrator, CouncilResult, CouncilTask};
use crate::pool::{PoolStatus, ProviderPool, ProviderStatus};
use crate::resilience::BreakerStatus;

/// State injected into admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<ProviderPool>,
    pub orchestrator: Arc<CouncilOrchestrator>,
    pub api_key: String,
    pub started_at: Instant,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub providers_ready: usize,
    pub providers_failed: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let pool_status = state.pool.get_status();
    let ready = pool_status
        .providers
        .iter()
        .filter(|p| p.status == ProviderStatus::Ready)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        providers_ready: ready,
        providers_failed: pool_status.providers.len() - ready,
    })
}

pub async fn get_providers(State(state): State<AdminState>) -> Json<PoolStatus> {
    Json(state.pool.get_status())
}

pub async fn get_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerStatus>> {
    let breakers = state
        .pool
        .get_status()
        .providers
        .into_iter()
        .filter_map(|p| p.breaker)
        .collect();
    Json(breakers)
}

/// Re-probe every admitted provider on demand and return the fresh status.
pub async fn run_health_check(State(state): State<AdminState>) -> Json<PoolStatus> {
    state.pool.perform_health_checks().await;
    Json(state.pool.get_status())
}

/// Run a council task. Intended for dashboards and smoke tests; the CMS
/// layer calls the orchestrator as a library.
pub async fn optimize(
    State(state): State<AdminState>,
    Json(task): Json<CouncilTask>,
) -> Json<CouncilResult> {
    Json(state.orchestrator.run(task).await)
}
