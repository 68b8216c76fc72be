//! The session record: the single mutable unit of work.

use crate::artifact::model::{SqlSchema, ValidationReport};
use crate::code::model::{ApiModel, ParsedCodeModel};
use crate::decision::model::{DecisionWarning, SelectedTechnology};
use crate::error::SessionError;
use crate::gap::model::{TechCategory, TechGap};
use crate::research::model::ResearchResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workflow phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    InputAnalysis,
    TechResearch,
    DecisionLoop,
    CodeAnalysis,
    DocumentGeneration,
    Persistence,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputAnalysis => "input_analysis",
            Self::TechResearch => "tech_research",
            Self::DecisionLoop => "decision_loop",
            Self::CodeAnalysis => "code_analysis",
            Self::DocumentGeneration => "document_generation",
            Self::Persistence => "persistence",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "input_analysis" => Self::InputAnalysis,
            "tech_research" => Self::TechResearch,
            "decision_loop" => Self::DecisionLoop,
            "code_analysis" => Self::CodeAnalysis,
            "document_generation" => Self::DocumentGeneration,
            "persistence" => Self::Persistence,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

/// What a suspended session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwaitKind {
    Clarification,
    Decision,
    WarningResolution,
}

impl AwaitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clarification => "clarification",
            Self::Decision => "decision",
            Self::WarningResolution => "warning-resolution",
        }
    }
}

/// Speaker of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    System,
    Agent,
    User,
}

/// One append-only conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub text: String,
    pub timestamp: String,
}

/// The in-flight unit of work producing one set of output artifacts.
///
/// Mutations go through the pure helpers in [`crate::session`]; the engine
/// holds the sole writable reference and never mutates across await points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub design_job_id: String,

    // Ingested inputs
    pub prd_text: String,
    pub design_docs: BTreeMap<String, String>,
    pub code_archive_path: Option<String>,

    // Completeness analysis
    pub completeness_score: u8,
    pub missing_elements: Vec<String>,
    pub ambiguous_elements: Vec<String>,
    pub clarification_questions: Vec<String>,

    // Gap research and decisions
    pub tech_gaps: Vec<TechGap>,
    pub research_results: Vec<ResearchResult>,
    pub selected_technologies: BTreeMap<TechCategory, SelectedTechnology>,
    pub pending_decisions: Vec<TechCategory>,
    pub decision_warnings: Vec<DecisionWarning>,
    /// Category of the most recently applied decision, for conflict
    /// validation and reselect handling.
    pub last_decision: Option<TechCategory>,

    // Code analysis
    pub parsed_code: Option<ParsedCodeModel>,
    pub inferred_api: Option<ApiModel>,

    // Generated artifacts
    pub trd_draft: Option<String>,
    pub openapi_spec: Option<String>,
    pub db_schema: Option<SqlSchema>,
    pub architecture_diagram: Option<String>,
    pub tech_stack_doc: Option<String>,
    pub validation_report: Option<ValidationReport>,
    /// Version written by the last successful artifact save.
    pub artifact_version: Option<i64>,

    // Execution state
    pub phase: WorkflowPhase,
    /// Name of the node currently or most recently executed.
    pub stage: String,
    pub progress: u8,
    pub trd_iterations: u32,
    pub clarification_rounds: u32,
    /// Per-category count of conflict-warning resolutions.
    pub conflict_rounds: BTreeMap<TechCategory, u32>,
    pub paused: bool,
    pub awaiting: Option<AwaitKind>,

    pub errors: Vec<SessionError>,
    pub transcript: Vec<TranscriptEntry>,

    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        design_job_id: impl Into<String>,
        code_archive_path: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            user_id: user_id.into(),
            design_job_id: design_job_id.into(),
            prd_text: String::new(),
            design_docs: BTreeMap::new(),
            code_archive_path,
            completeness_score: 0,
            missing_elements: Vec::new(),
            ambiguous_elements: Vec::new(),
            clarification_questions: Vec::new(),
            tech_gaps: Vec::new(),
            research_results: Vec::new(),
            selected_technologies: BTreeMap::new(),
            pending_decisions: Vec::new(),
            decision_warnings: Vec::new(),
            last_decision: None,
            parsed_code: None,
            inferred_api: None,
            trd_draft: None,
            openapi_spec: None,
            db_schema: None,
            architecture_diagram: None,
            tech_stack_doc: None,
            validation_report: None,
            artifact_version: None,
            phase: WorkflowPhase::InputAnalysis,
            stage: String::new(),
            progress: 0,
            trd_iterations: 0,
            clarification_rounds: 0,
            conflict_rounds: BTreeMap::new(),
            paused: false,
            awaiting: None,
            errors: Vec::new(),
            transcript: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
