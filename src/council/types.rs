//! Council task and result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::council::roles::Role;
use crate::council::scoring::ScoreBreakdown;

/// How much of the council a task engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    /// Every council seat.
    Full,
    /// Primary content only.
    Quick,
}

impl Workflow {
    pub fn roles(self) -> &'static [Role] {
        match self {
            Workflow::Full => Role::all(),
            Workflow::Quick => &[Role::Content],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Workflow::Full => "full",
            Workflow::Quick => "quick",
        }
    }
}

/// One content task submitted to the council. Ephemeral, per request.
#[derive(Debug, Clone, Deserialize)]
pub struct CouncilTask {
    /// Draft content or prompt to optimize.
    pub content: String,

    /// Content type tag (e.g. "blog-post"), used in prompts.
    pub content_type: String,

    pub workflow: Workflow,
}

/// What one council seat produced, or why it could not.
#[derive(Debug, Clone, Serialize)]
pub struct RoleContribution {
    pub role: Role,
    /// Provider that filled the seat, when one did.
    pub provider: Option<String>,
    pub content: Option<String>,
    pub succeeded: bool,
    /// Last error seen while walking the candidate list, when unfilled —
    /// or on a filled seat, `None`.
    pub error: Option<String>,
    /// Deterministic aggregation confidence; 0.0 when unfilled.
    pub confidence: f64,
}

/// Aggregated council output with full provenance.
///
/// The CMS layer persists this verbatim as opaque `optimization_metadata`;
/// only `final_content` and `quality_score` are interpreted.
#[derive(Debug, Clone, Serialize)]
pub struct CouncilResult {
    pub task_id: Uuid,
    pub final_content: String,
    /// Provider whose output became `final_content`.
    pub provider_used: Option<String>,
    /// Deterministic structural quality estimate, 0-100.
    pub quality_score: u8,
    pub score_breakdown: ScoreBreakdown,
    /// `false` when every seat went unfilled and `final_content` is the
    /// caller's original input.
    pub optimization_applied: bool,
    pub contributions: Vec<RoleContribution>,
    /// Unix seconds at completion.
    pub timestamp: u64,
}
