//! Output artifact and validation-report models.

use serde::{Deserialize, Serialize};

/// DDL plus its textual entity-relationship diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlSchema {
    pub ddl: String,
    pub erd: String,
}

/// The specialist reviewers contributing to the composite TRD score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerKind {
    Architecture,
    Security,
    Performance,
    Api,
    Database,
    Clarity,
}

impl ReviewerKind {
    pub const ALL: &'static [ReviewerKind] = &[
        Self::Architecture,
        Self::Security,
        Self::Performance,
        Self::Api,
        Self::Database,
        Self::Clarity,
    ];

    /// Relative weight in the reviewer aggregate.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Architecture => 0.20,
            Self::Security => 0.15,
            Self::Performance => 0.10,
            Self::Api => 0.25,
            Self::Database => 0.25,
            Self::Clarity => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Api => "api",
            Self::Database => "database",
            Self::Clarity => "clarity",
        }
    }
}

/// One reviewer's score and findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerScore {
    pub reviewer: ReviewerKind,
    /// 0-100.
    pub score: u8,
    pub notes: Vec<String>,
}

/// A deficiency found during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGap {
    pub severity: crate::decision::model::WarningSeverity,
    pub detail: String,
}

/// Composite validation result for one TRD iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 0-100 composite.
    pub overall: u8,
    /// Structural points, 0-15.
    pub structure: u8,
    pub clarity: u8,
    pub actionability: u8,
    pub consistency: u8,
    /// Weighted reviewer average, 0-100.
    pub reviewer_aggregate: u8,
    pub reviewers: Vec<ReviewerScore>,
    pub gaps: Vec<ReportGap>,
    pub recommendations: Vec<String>,
    /// 1-based regenerate-loop iteration this report belongs to.
    pub iteration: u32,
    pub passed: bool,
    /// True when the regenerate budget was exhausted and the draft was
    /// accepted below threshold for downstream human review.
    pub forced_pass: bool,
}

/// The five generated artifacts plus their validation report, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub trd: String,
    pub openapi: String,
    pub sql: SqlSchema,
    pub architecture: String,
    pub tech_stack: String,
    pub validation: ValidationReport,
    pub version: i64,
    pub created_at: String,
}
