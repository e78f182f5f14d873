//! Council subsystem.
//!
//! # Data Flow
//! ```text
//! CouncilTask (content, workflow, content_type)
//!     → roles.rs (which seats the workflow engages)
//!     → orchestrator.rs:
//!         pool.get_providers_by_role(role) per seat
//!         → breaker.execute(provider.complete) per candidate
//!         → fallback to next candidate on failure
//!     → aggregation (highest-confidence contribution wins)
//!     → scoring.rs (deterministic 0-100 estimate)
//!     → CouncilResult (content, score, provenance)
//! ```
//!
//! # Design Decisions
//! - Seats fan out concurrently; candidates within a seat are sequential
//! - Partial failure degrades the score, never the call
//! - Scoring is structural and deterministic, not learned

pub mod orchestrator;
pub mod roles;
pub mod scoring;
pub mod types;

pub use orchestrator::CouncilOrchestrator;
pub use roles::Role;
pub use scoring::{score_content, ScoreBreakdown};
pub use types::{CouncilResult, CouncilTask, RoleContribution, Workflow};
