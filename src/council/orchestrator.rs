//! Council orchestration.
//!
//! # Responsibilities
//! - Resolve the role table to ordered candidates via the pool
//! - Fan role calls out concurrently, each through its provider's breaker
//! - Walk candidates per role on failure (bounded fallback, no retry storm)
//! - Aggregate contributions into one scored result with provenance
//!
//! # Design Decisions
//! - A role failure never aborts the task; an unfilled role is recorded
//!   with its last error and the task continues
//! - Total failure still returns a result: the original input content,
//!   unoptimized, so the caller always has safe content to persist
//! - The orchestrator only reads from the pool and calls public breaker
//!   operations; it never mutates pool or breaker state directly

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use uuid::Uuid;

use crate::config::schema::{OrchestratorConfig, ScoringConfig};
use crate::council::roles::Role;
use crate::council::scoring::score_content;
use crate::council::types::{CouncilResult, CouncilTask, RoleContribution};
use crate::observability::metrics;
use crate::pool::ProviderPool;
use crate::provider::types::CompletionRequest;

/// Coordinates multiple providers under their breakers to turn one
/// [`CouncilTask`] into one [`CouncilResult`].
pub struct CouncilOrchestrator {
    pool: Arc<ProviderPool>,
    config: OrchestratorConfig,
    scoring: ScoringConfig,
}

impl CouncilOrchestrator {
    pub fn new(pool: Arc<ProviderPool>, config: OrchestratorConfig, scoring: ScoringConfig) -> Self {
        Self {
            pool,
            config,
            scoring,
        }
    }

    /// Run one task through the council.
    ///
    /// Never fails: partial and even total provider degradation produce a
    /// usable result, with the degradation visible in `contributions` and
    /// the quality score.
    pub async fn run(&self, task: CouncilTask) -> CouncilResult {
        let task_id = Uuid::new_v4();
        let start = Instant::now();
        let roles = task.workflow.roles();

        tracing::info!(
            task_id = %task_id,
            workflow = task.workflow.as_str(),
            roles = roles.len(),
            content_type = %task.content_type,
            "Council task started"
        );

        let contributions: Vec<RoleContribution> =
            join_all(roles.iter().map(|role| self.fill_role(*role, &task))).await;

        let best = contributions
            .iter()
            .filter(|c| c.succeeded)
            .filter(|c| c.content.as_deref().is_some_and(|t| !t.trim().is_empty()))
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(Ordering::Equal)
            });

        let (final_content, provider_used, optimization_applied) = match best {
            Some(contribution) => (
                contribution.content.clone().unwrap_or_default(),
                contribution.provider.clone(),
                true,
            ),
            None => {
                tracing::warn!(
                    task_id = %task_id,
                    "Every council seat unfilled, returning original content"
                );
                (task.content.clone(), None, false)
            }
        };

        let unfilled: Vec<Role> = contributions
            .iter()
            .filter(|c| !c.succeeded)
            .map(|c| c.role)
            .collect();
        let breakdown = score_content(&final_content, &unfilled, &self.scoring);

        metrics::record_council_task(
            task.workflow.as_str(),
            optimization_applied,
            breakdown.total,
            start,
        );
        tracing::info!(
            task_id = %task_id,
            quality_score = breakdown.total,
            optimization_applied,
            filled = contributions.len() - unfilled.len(),
            unfilled = unfilled.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Council task finished"
        );

        CouncilResult {
            task_id,
            final_content,
            provider_used,
            quality_score: breakdown.total,
            score_breakdown: breakdown,
            optimization_applied,
            contributions,
            timestamp: unix_now(),
        }
    }

    /// Fill one council seat: walk the role's candidates in priority order
    /// until one answers, or record the seat as unfilled.
    async fn fill_role(&self, role: Role, task: &CouncilTask) -> RoleContribution {
        let candidates = self.pool.get_providers_by_role(role);
        if candidates.is_empty() {
            tracing::warn!(role = %role, "No providers available for role");
            return unfilled(role, "no providers available for role".to_string());
        }

        let request = self.build_request(role, task);
        let mut last_error: Option<String> = None;

        for (handle, _state) in candidates
            .into_iter()
            .take(self.config.max_candidates_per_role)
        {
            let name = handle.provider.name().to_string();

            if !handle.breaker.allows_requests() {
                tracing::debug!(role = %role, provider = %name, "Skipping candidate, circuit open");
                last_error = Some(format!("{}: circuit open", name));
                continue;
            }

            match handle
                .breaker
                .execute(|| handle.provider.complete(&request))
                .await
            {
                Ok(completion) => {
                    tracing::debug!(role = %role, provider = %name, "Seat filled");
                    return RoleContribution {
                        role,
                        confidence: confidence(role, &completion.text),
                        provider: Some(name),
                        content: Some(completion.text),
                        succeeded: true,
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        role = %role,
                        provider = %name,
                        error = %e,
                        "Candidate failed, advancing to next"
                    );
                    last_error = Some(format!("{}: {}", name, e));
                }
            }
        }

        unfilled(
            role,
            last_error.unwrap_or_else(|| "candidate list exhausted".to_string()),
        )
    }

    fn build_request(&self, role: Role, task: &CouncilTask) -> CompletionRequest {
        let system = match role {
            Role::Content => format!(
                "You are a {title}. Rewrite the {kind} draft below into its best \
                 version: clear structure, engaging prose, preserved facts. \
                 Return only the improved {kind}.",
                title = role.title(),
                kind = task.content_type,
            ),
            Role::SeoReview => format!(
                "You are an {title}. Revise the {kind} draft below for search \
                 visibility: natural keyword usage, descriptive headings, a \
                 compelling opening. Return only the revised {kind}.",
                title = role.title(),
                kind = task.content_type,
            ),
            Role::FactCheck => format!(
                "You are a {title}. Verify the factual claims in the {kind} \
                 draft below, correct inaccuracies, and cite sources for key \
                 claims. Return the corrected {kind} with citations.",
                title = role.title(),
                kind = task.content_type,
            ),
        };

        CompletionRequest {
            system: Some(system),
            prompt: task.content.clone(),
            model: None,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

fn unfilled(role: Role, error: String) -> RoleContribution {
    RoleContribution {
        role,
        provider: None,
        content: None,
        succeeded: false,
        error: Some(error),
        confidence: 0.0,
    }
}

/// Deterministic aggregation confidence: the seat's weight scaled by how
/// substantial the output is. Primary content wins ties by construction.
fn confidence(role: Role, text: &str) -> f64 {
    let completeness = (text.split_whitespace().count() as f64 / 120.0).min(1.0);
    role.weight() * (0.5 + 0.5 * completeness)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CouncilConfig;
    use crate::council::types::Workflow;

    fn empty_pool() -> Arc<ProviderPool> {
        Arc::new(ProviderPool::new(Arc::new(CouncilConfig::default())))
    }

    fn task(workflow: Workflow) -> CouncilTask {
        CouncilTask {
            content: "Original draft content for the post.".to_string(),
            content_type: "blog-post".to_string(),
            workflow,
        }
    }

    #[tokio::test]
    async fn test_empty_pool_returns_original_content() {
        let pool = empty_pool();
        pool.initialize().await;
        let orchestrator =
            CouncilOrchestrator::new(pool, Default::default(), Default::default());

        let result = orchestrator.run(task(Workflow::Full)).await;

        assert!(!result.optimization_applied);
        assert_eq!(result.final_content, "Original draft content for the post.");
        assert!(result.provider_used.is_none());
        assert_eq!(result.contributions.len(), Role::all().len());
        assert!(result.contributions.iter().all(|c| !c.succeeded));
        assert!(result.score_breakdown.role_penalty > 0);
    }

    #[tokio::test]
    async fn test_quick_workflow_engages_content_only() {
        let pool = empty_pool();
        pool.initialize().await;
        let orchestrator =
            CouncilOrchestrator::new(pool, Default::default(), Default::default());

        let result = orchestrator.run(task(Workflow::Quick)).await;

        assert_eq!(result.contributions.len(), 1);
        assert_eq!(result.contributions[0].role, Role::Content);
    }

    #[test]
    fn test_confidence_prefers_content_role() {
        let text = vec!["word"; 200].join(" ");
        assert!(confidence(Role::Content, &text) > confidence(Role::SeoReview, &text));
        assert!(confidence(Role::SeoReview, &text) > confidence(Role::FactCheck, &text));
    }

    #[test]
    fn test_confidence_scales_with_substance() {
        assert!(confidence(Role::Content, "one two three")
            < confidence(Role::Content, &vec!["word"; 200].join(" ")));
    }
}
