//! Provider subsystem.
//!
//! # Data Flow
//! ```text
//! ProviderConfig (config/)
//!     → factory.rs (resolve credentials, attach breaker)
//!     → client.rs (dialect-specific completion + probe calls)
//!
//! One breaker per provider name, created at first construction and shared
//! by every Provider instance for that name.
//! ```
//!
//! # Design Decisions
//! - Providers are cheap immutable descriptors over a shared reqwest client
//! - The factory, not the pool, owns breaker identity

pub mod client;
pub mod factory;
pub mod types;

pub use client::Provider;
pub use factory::{ConfigurationError, ProbeOutcome, ProviderFactory, ProviderHandle};
pub use types::{Completion, CompletionRequest, ProviderError, ProviderResult};
