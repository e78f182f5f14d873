//! Provider pool subsystem.
//!
//! # Data Flow
//! ```text
//! initialize():
//!     enabled providers (config)
//!     → factory (construct + attach breaker)
//!     → admission probe (concurrent, per provider)
//!     → PoolEntry (Ready | Failed)
//!
//! Periodic health checks (health.rs):
//!     timer → re-probe admitted providers → update entries
//!
//! Lookups:
//!     get_provider(name) / get_providers_by_role(role)
//!     → Ready entries only, configuration order
//! ```
//!
//! # Design Decisions
//! - Admission requires a healthy probe; later failures never evict
//! - Single-flight initialization at whole-pool granularity
//! - Health state is per-provider, breaker state decides usage

pub mod health;
pub mod registry;

pub use health::HealthMonitor;
pub use registry::{PoolEntry, PoolStatus, ProviderPool, ProviderStatus, ProviderView};
