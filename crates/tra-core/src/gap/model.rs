//! Technology gap domain models.

use serde::{Deserialize, Serialize};

/// The closed set of technology categories a gap can belong to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TechCategory {
    Authentication,
    Database,
    Storage,
    Messaging,
    Caching,
    Email,
    Payments,
    Realtime,
    Search,
    Analytics,
    Monitoring,
    Deployment,
}

impl TechCategory {
    /// All recognised categories, in presentation order.
    pub const ALL: &'static [TechCategory] = &[
        Self::Authentication,
        Self::Database,
        Self::Storage,
        Self::Messaging,
        Self::Caching,
        Self::Email,
        Self::Payments,
        Self::Realtime,
        Self::Search,
        Self::Analytics,
        Self::Monitoring,
        Self::Deployment,
    ];

    /// Parse from string; unknown tags return `None` and are discarded.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "authentication" | "auth" => Some(Self::Authentication),
            "database" | "db" => Some(Self::Database),
            "storage" | "file_storage" => Some(Self::Storage),
            "messaging" | "queue" => Some(Self::Messaging),
            "caching" | "cache" => Some(Self::Caching),
            "email" | "mail" => Some(Self::Email),
            "payments" | "billing" => Some(Self::Payments),
            "realtime" | "real_time" => Some(Self::Realtime),
            "search" => Some(Self::Search),
            "analytics" => Some(Self::Analytics),
            "monitoring" | "observability" => Some(Self::Monitoring),
            "deployment" | "hosting" => Some(Self::Deployment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Database => "database",
            Self::Storage => "storage",
            Self::Messaging => "messaging",
            Self::Caching => "caching",
            Self::Email => "email",
            Self::Payments => "payments",
            Self::Realtime => "realtime",
            Self::Search => "search",
            Self::Analytics => "analytics",
            Self::Monitoring => "monitoring",
            Self::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for TechCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of resolving a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl GapPriority {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A technology category the upstream inputs left undecided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechGap {
    pub category: TechCategory,
    pub description: String,
    pub priority: GapPriority,
    pub impact: String,
    /// Candidate option names hinted by the inputs, if any.
    pub candidate_hints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_aliases() {
        assert_eq!(TechCategory::parse("auth"), Some(TechCategory::Authentication));
        assert_eq!(TechCategory::parse("DB"), Some(TechCategory::Database));
        assert_eq!(TechCategory::parse("real_time"), Some(TechCategory::Realtime));
        assert_eq!(TechCategory::parse("blockchain"), None);
    }

    #[test]
    fn test_category_round_trip() {
        for cat in TechCategory::ALL {
            assert_eq!(TechCategory::parse(cat.as_str()), Some(*cat));
        }
    }

    #[test]
    fn test_category_as_json_map_key() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(TechCategory::Database, "postgres");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"database":"postgres"}"#);
    }
}
