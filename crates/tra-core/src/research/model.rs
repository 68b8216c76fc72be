//! Technology research domain models.

use crate::gap::model::TechCategory;
use serde::{Deserialize, Serialize};

/// Coarse low/medium/high tag used for learning curve and integration
/// complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelTag {
    Low,
    Medium,
    High,
}

impl LevelTag {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" | "easy" => Self::Low,
            "high" | "hard" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// Documentation quality tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTag {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityTag {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "poor" => Self::Poor,
            "fair" => Self::Fair,
            "excellent" => Self::Excellent,
            _ => Self::Good,
        }
    }
}

/// One candidate technology for a gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechOption {
    pub name: String,
    pub description: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub use_cases: Vec<String>,
    /// 0-100.
    pub popularity: u8,
    pub learning_curve: LevelTag,
    pub documentation_quality: QualityTag,
    pub integration_complexity: LevelTag,
    pub sources: Vec<String>,
}

/// Research output for one gap category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub category: TechCategory,
    /// 2-3 options ordered by composite score, best first.
    pub options: Vec<TechOption>,
    pub summary: String,
    /// Name of the single recommended option, when one stands out.
    pub recommendation: Option<String>,
    /// True when the built-in catalogue substituted for a search outage.
    pub from_catalogue: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_tag_parse() {
        assert_eq!(LevelTag::parse("Easy"), LevelTag::Low);
        assert_eq!(LevelTag::parse("hard"), LevelTag::High);
        assert_eq!(LevelTag::parse("moderate"), LevelTag::Medium);
    }

    #[test]
    fn test_quality_tag_parse() {
        assert_eq!(QualityTag::parse("excellent"), QualityTag::Excellent);
        assert_eq!(QualityTag::parse("unknown"), QualityTag::Good);
    }
}
