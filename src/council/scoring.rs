//! Deterministic content quality scoring.
//!
//! Produces a 0-100 estimate from structural features only: word count
//! against a target range, presence of cited sources, presence of
//! authorship markers, and council seat coverage. No model calls, no
//! randomness; the same content and coverage always score the same.
//!
//! Component budget: length 40, sourcing 30, authorship 30. Unfilled seats
//! subtract fixed penalties from the combined total.

use serde::Serialize;

use crate::config::schema::ScoringConfig;
use crate::council::roles::Role;

/// Per-component score breakdown, kept in results so dashboards can explain
/// the total.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub length: u8,
    pub sourcing: u8,
    pub authorship: u8,
    /// Total penalty applied for unfilled seats.
    pub role_penalty: u8,
    pub total: u8,
}

/// Score `content` given the roles that went unfilled.
pub fn score_content(content: &str, unfilled: &[Role], config: &ScoringConfig) -> ScoreBreakdown {
    let length = length_component(content, config);
    let sourcing = sourcing_component(content);
    let authorship = authorship_component(content);

    let mut penalty: u32 = 0;
    for role in unfilled {
        penalty += if role.is_critical() {
            config.missing_critical_penalty as u32
        } else {
            config.missing_role_penalty as u32
        };
    }

    let raw = length as u32 + sourcing as u32 + authorship as u32;
    let total = raw.saturating_sub(penalty).min(100) as u8;

    ScoreBreakdown {
        length,
        sourcing,
        authorship,
        role_penalty: penalty.min(100) as u8,
        total,
    }
}

/// 0-40 points for word count against the target range. Full marks inside
/// the range; proportional falloff outside it.
fn length_component(content: &str, config: &ScoringConfig) -> u8 {
    let words = content.split_whitespace().count();
    if words == 0 {
        return 0;
    }

    let min = config.target_words_min.max(1);
    let max = config.target_words_max.max(min);

    if words < min {
        (40 * words / min) as u8
    } else if words > max {
        ((40 * max / words) as u8).max(10)
    } else {
        40
    }
}

/// 0-30 points for cited sources: links weigh most, citation phrasing adds
/// a little.
fn sourcing_component(content: &str) -> u8 {
    let lowered = content.to_lowercase();
    let links = lowered.matches("http://").count() + lowered.matches("https://").count();

    let mut points: u8 = match links {
        0 => 0,
        1 | 2 => 20,
        _ => 30,
    };

    let has_citation_phrase = ["according to", "source:", "a study", "research shows"]
        .iter()
        .any(|phrase| lowered.contains(phrase));
    if has_citation_phrase {
        points = points.saturating_add(10);
    }

    points.min(30)
}

/// 0-30 points for authorship and credential markers.
fn authorship_component(content: &str) -> u8 {
    let lowered = content.to_lowercase();

    let has_byline = ["written by", "reviewed by", "author:", "about the author"]
        .iter()
        .any(|marker| lowered.contains(marker));
    let has_credential = ["ph.d", "phd", "m.d.", "certified", "years of experience"]
        .iter()
        .any(|marker| lowered.contains(marker));

    match (has_byline, has_credential) {
        (true, true) => 30,
        (true, false) => 20,
        (false, true) => 10,
        (false, false) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig {
            target_words_min: 10,
            target_words_max: 100,
            missing_critical_penalty: 30,
            missing_role_penalty: 10,
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_empty_content_scores_zero() {
        let breakdown = score_content("", &[], &config());
        assert_eq!(breakdown.total, 0);
    }

    #[test]
    fn test_full_marks_content() {
        let content = format!(
            "{} According to https://example.com/study and https://example.org \
             research shows gains. Written by a certified expert with a Ph.D.",
            words(40)
        );
        let breakdown = score_content(&content, &[], &config());
        assert_eq!(breakdown.length, 40);
        assert_eq!(breakdown.sourcing, 30);
        assert_eq!(breakdown.authorship, 30);
        assert_eq!(breakdown.total, 100);
    }

    #[test]
    fn test_short_content_partial_length() {
        let breakdown = score_content(&words(5), &[], &config());
        assert_eq!(breakdown.length, 20);
    }

    #[test]
    fn test_penalties_subtract() {
        let content = words(40);
        let clean = score_content(&content, &[], &config());
        let penalized = score_content(&content, &[Role::Content, Role::SeoReview], &config());
        assert_eq!(clean.total - penalized.total, 40);
        assert_eq!(penalized.role_penalty, 40);
    }

    #[test]
    fn test_score_floor_is_zero() {
        let breakdown = score_content(
            "tiny",
            &[Role::Content, Role::SeoReview, Role::FactCheck],
            &config(),
        );
        assert_eq!(breakdown.total, 0);
    }

    #[test]
    fn test_deterministic() {
        let content = format!("{} https://example.com written by staff", words(30));
        let a = score_content(&content, &[Role::FactCheck], &config());
        let b = score_content(&content, &[Role::FactCheck], &config());
        assert_eq!(a.total, b.total);
    }
}
