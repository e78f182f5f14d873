//! Admin/status API.
//!
//! Read-only snapshots of pool health and breaker state, plus an on-demand
//! health check and a council smoke-test endpoint. Bearer-token protected.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/providers", get(get_providers))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/health-check", post(run_health_check))
        .route("/admin/optimize", post(optimize))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
