//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to provider:
//!     → circuit_breaker.rs execute() (admission gate, timeout race)
//!     → On failure: failure counted, circuit may open
//!     → On open circuit: fail fast with retry-after
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Circuit breaker prevents cascading failures across providers
//! - One breaker per provider name, shared by every caller

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerError, BreakerState, BreakerStatus, CircuitBreaker};
