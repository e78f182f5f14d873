//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Respect RUST_LOG when set, config log level otherwise

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured level is applied to
/// this crate and `info` to dependencies.
pub fn init_logging(log_level: &str) {
    let default_filter = format!("swarm_council={},info", log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
