//! Technology decision domain models.

use crate::gap::model::TechCategory;
use serde::{Deserialize, Serialize};

/// The user's recorded choice for one gap category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedTechnology {
    pub option_name: String,
    pub rationale: Option<String>,
    pub decided_at: String,
}

impl SelectedTechnology {
    pub fn new(option_name: impl Into<String>, rationale: Option<String>) -> Self {
        Self {
            option_name: option_name.into(),
            rationale,
            decided_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Severity of a decision conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Critical,
    Warning,
    Info,
}

impl WarningSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A detected incompatibility between a new decision and prior state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionWarning {
    pub category: TechCategory,
    pub option_name: String,
    pub explanation: String,
    pub severity: WarningSeverity,
    pub remedy: String,
}

/// How the user resolved a conflict warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningAction {
    /// Retract the selection and re-present options for the gap.
    Reselect,
    /// Keep the selection despite the warning.
    Proceed,
}
