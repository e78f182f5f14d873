//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize pool → Start background tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Tasks exit → Drain in-flight calls
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then pool, then listeners
//! - Shutdown drains provider calls before exit

pub mod shutdown;

pub use shutdown::Shutdown;
