//! Typed council roles.
//!
//! Roles are a closed enum rather than free-form string tags: unknown tags in
//! configuration are rejected at load time, and role coverage can be checked
//! exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named specialization a provider may be tagged to fulfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Primary Content Specialist: produces the optimized draft.
    Content,
    /// SEO Reviewer: rewrites for search visibility.
    SeoReview,
    /// Fact Checker: verifies claims and flags unsupported statements.
    FactCheck,
}

/// Error for unrecognized role tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role tag '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every role, in council seating order.
    pub fn all() -> &'static [Role] {
        &[Role::Content, Role::SeoReview, Role::FactCheck]
    }

    /// Critical roles carry a heavier scoring penalty when unfilled.
    pub fn is_critical(self) -> bool {
        matches!(self, Role::Content)
    }

    /// Stable configuration tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Content => "content",
            Role::SeoReview => "seo-review",
            Role::FactCheck => "fact-check",
        }
    }

    /// Human-readable council seat title, used in prompts and logs.
    pub fn title(self) -> &'static str {
        match self {
            Role::Content => "Primary Content Specialist",
            Role::SeoReview => "SEO Reviewer",
            Role::FactCheck => "Fact Checker",
        }
    }

    /// Aggregation weight: when several roles produce output, the highest
    /// weighted successful contribution becomes the final content.
    pub fn weight(self) -> f64 {
        match self {
            Role::Content => 1.0,
            Role::SeoReview => 0.8,
            Role::FactCheck => 0.6,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Role::Content),
            "seo-review" => Ok(Role::SeoReview),
            "fact-check" => Ok(Role::FactCheck),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_tags() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            "astrology".parse::<Role>(),
            Err(UnknownRole("astrology".to_string()))
        );
    }

    #[test]
    fn test_content_is_critical() {
        assert!(Role::Content.is_critical());
        assert!(!Role::SeoReview.is_critical());
        assert!(!Role::FactCheck.is_critical());
    }
}
