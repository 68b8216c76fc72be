//! Node inventory, progress bands, and conditional routing.
//!
//! The graph is name-keyed: checkpoints store the next node's name and the
//! routing function is a pure function of the checkpointed session, so
//! replaying a checkpoint reproduces the same transition.

use tra_core::config::WorkflowConfig;
use tra_core::session::model::{AwaitKind, Session, WorkflowPhase};

/// The nineteen workflow nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    LoadInputs,
    AnalyzeCompleteness,
    AskUserClarification,
    IdentifyTechGaps,
    ResearchTechnologies,
    PresentOptions,
    WaitUserDecision,
    ValidateDecision,
    WarnUser,
    ParseAiStudioCode,
    InferApiSpec,
    GenerateTrd,
    ValidateTrd,
    GenerateApiSpec,
    GenerateDbSchema,
    GenerateArchitecture,
    GenerateTechStackDoc,
    SaveToDb,
    NotifyNextAgent,
}

impl NodeId {
    pub const ALL: &'static [NodeId] = &[
        Self::LoadInputs,
        Self::AnalyzeCompleteness,
        Self::AskUserClarification,
        Self::IdentifyTechGaps,
        Self::ResearchTechnologies,
        Self::PresentOptions,
        Self::WaitUserDecision,
        Self::ValidateDecision,
        Self::WarnUser,
        Self::ParseAiStudioCode,
        Self::InferApiSpec,
        Self::GenerateTrd,
        Self::ValidateTrd,
        Self::GenerateApiSpec,
        Self::GenerateDbSchema,
        Self::GenerateArchitecture,
        Self::GenerateTechStackDoc,
        Self::SaveToDb,
        Self::NotifyNextAgent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadInputs => "load_inputs",
            Self::AnalyzeCompleteness => "analyze_completeness",
            Self::AskUserClarification => "ask_user_clarification",
            Self::IdentifyTechGaps => "identify_tech_gaps",
            Self::ResearchTechnologies => "research_technologies",
            Self::PresentOptions => "present_options",
            Self::WaitUserDecision => "wait_user_decision",
            Self::ValidateDecision => "validate_decision",
            Self::WarnUser => "warn_user",
            Self::ParseAiStudioCode => "parse_ai_studio_code",
            Self::InferApiSpec => "infer_api_spec",
            Self::GenerateTrd => "generate_trd",
            Self::ValidateTrd => "validate_trd",
            Self::GenerateApiSpec => "generate_api_spec",
            Self::GenerateDbSchema => "generate_db_schema",
            Self::GenerateArchitecture => "generate_architecture",
            Self::GenerateTechStackDoc => "generate_tech_stack_doc",
            Self::SaveToDb => "save_to_db",
            Self::NotifyNextAgent => "notify_next_agent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|n| n.name() == s).copied()
    }

    /// (start, end) progress percentages for this node.
    pub fn progress_band(&self) -> (u8, u8) {
        match self {
            Self::LoadInputs => (0, 5),
            Self::AnalyzeCompleteness => (5, 10),
            Self::AskUserClarification => (10, 15),
            Self::IdentifyTechGaps => (15, 25),
            Self::ResearchTechnologies => (25, 35),
            Self::PresentOptions => (35, 40),
            Self::WaitUserDecision => (40, 45),
            Self::ValidateDecision => (45, 48),
            Self::WarnUser => (48, 50),
            Self::ParseAiStudioCode => (50, 55),
            Self::InferApiSpec => (55, 65),
            Self::GenerateTrd => (65, 70),
            Self::ValidateTrd => (70, 75),
            Self::GenerateApiSpec => (75, 80),
            Self::GenerateDbSchema => (80, 85),
            Self::GenerateArchitecture => (85, 90),
            Self::GenerateTechStackDoc => (90, 95),
            Self::SaveToDb => (95, 98),
            Self::NotifyNextAgent => (98, 100),
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        match self {
            Self::LoadInputs | Self::AnalyzeCompleteness | Self::AskUserClarification => {
                WorkflowPhase::InputAnalysis
            }
            Self::IdentifyTechGaps | Self::ResearchTechnologies => WorkflowPhase::TechResearch,
            Self::PresentOptions | Self::WaitUserDecision | Self::ValidateDecision | Self::WarnUser => {
                WorkflowPhase::DecisionLoop
            }
            Self::ParseAiStudioCode | Self::InferApiSpec => WorkflowPhase::CodeAnalysis,
            Self::GenerateTrd
            | Self::ValidateTrd
            | Self::GenerateApiSpec
            | Self::GenerateDbSchema
            | Self::GenerateArchitecture
            | Self::GenerateTechStackDoc => WorkflowPhase::DocumentGeneration,
            Self::SaveToDb | Self::NotifyNextAgent => WorkflowPhase::Persistence,
        }
    }

    /// Which await state this node suspends into, for the three
    /// human-in-the-loop nodes.
    pub fn suspends(&self) -> Option<AwaitKind> {
        match self {
            Self::AskUserClarification => Some(AwaitKind::Clarification),
            Self::WaitUserDecision => Some(AwaitKind::Decision),
            Self::WarnUser => Some(AwaitKind::WarningResolution),
            _ => None,
        }
    }

    /// Errors in these nodes are fatal regardless of kind.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::LoadInputs | Self::SaveToDb)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where execution goes after a node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(NodeId),
    Suspend(AwaitKind),
    Complete,
}

/// Evaluate the routing predicates for the node that just ran.
pub fn successor(node: NodeId, session: &Session, config: &WorkflowConfig) -> Transition {
    match node {
        NodeId::LoadInputs => Transition::Next(NodeId::AnalyzeCompleteness),

        NodeId::AnalyzeCompleteness => {
            if session.completeness_score >= config.completeness_threshold
                || session.clarification_rounds >= config.max_clarification_rounds
            {
                Transition::Next(NodeId::IdentifyTechGaps)
            } else {
                Transition::Next(NodeId::AskUserClarification)
            }
        }

        NodeId::AskUserClarification => Transition::Suspend(AwaitKind::Clarification),

        NodeId::IdentifyTechGaps => {
            if session.tech_gaps.is_empty() {
                Transition::Next(NodeId::ParseAiStudioCode)
            } else {
                Transition::Next(NodeId::ResearchTechnologies)
            }
        }

        NodeId::ResearchTechnologies => Transition::Next(NodeId::PresentOptions),

        NodeId::PresentOptions => Transition::Next(NodeId::WaitUserDecision),

        NodeId::WaitUserDecision => Transition::Suspend(AwaitKind::Decision),

        NodeId::ValidateDecision => {
            if !session.decision_warnings.is_empty() {
                Transition::Next(NodeId::WarnUser)
            } else {
                after_decision_settled(session)
            }
        }

        NodeId::WarnUser => Transition::Suspend(AwaitKind::WarningResolution),

        NodeId::ParseAiStudioCode => Transition::Next(NodeId::InferApiSpec),

        NodeId::InferApiSpec => Transition::Next(NodeId::GenerateTrd),

        NodeId::GenerateTrd => Transition::Next(NodeId::ValidateTrd),

        NodeId::ValidateTrd => {
            let proceed = session
                .validation_report
                .as_ref()
                .map(|r| r.passed || r.forced_pass)
                .unwrap_or(false);
            if proceed {
                Transition::Next(NodeId::GenerateApiSpec)
            } else {
                Transition::Next(NodeId::GenerateTrd)
            }
        }

        NodeId::GenerateApiSpec => Transition::Next(NodeId::GenerateDbSchema),
        NodeId::GenerateDbSchema => Transition::Next(NodeId::GenerateArchitecture),
        NodeId::GenerateArchitecture => Transition::Next(NodeId::GenerateTechStackDoc),
        NodeId::GenerateTechStackDoc => Transition::Next(NodeId::SaveToDb),
        NodeId::SaveToDb => Transition::Next(NodeId::NotifyNextAgent),
        NodeId::NotifyNextAgent => Transition::Complete,
    }
}

/// Once a decision stands (no open warnings), either present the next gap
/// or move on to code analysis.
pub fn after_decision_settled(session: &Session) -> Transition {
    if session.pending_decisions.is_empty() {
        Transition::Next(NodeId::ParseAiStudioCode)
    } else {
        Transition::Next(NodeId::PresentOptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tra_core::artifact::model::ValidationReport;
    use tra_core::gap::model::{GapPriority, TechCategory, TechGap};

    fn session() -> Session {
        Session::new("s-1", "p-1", "u-1", "job-1", None)
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig::default()
    }

    fn report(overall: u8, passed: bool, forced: bool) -> ValidationReport {
        ValidationReport {
            overall,
            structure: 15,
            clarity: overall,
            actionability: overall,
            consistency: overall,
            reviewer_aggregate: overall,
            reviewers: Vec::new(),
            gaps: Vec::new(),
            recommendations: Vec::new(),
            iteration: 1,
            passed,
            forced_pass: forced,
        }
    }

    #[test]
    fn test_names_round_trip() {
        for node in NodeId::ALL {
            assert_eq!(NodeId::parse(node.name()), Some(*node));
        }
    }

    #[test]
    fn test_bands_cover_zero_to_hundred() {
        let mut last_end = 0;
        for node in NodeId::ALL {
            let (start, end) = node.progress_band();
            assert!(start < end, "{} band inverted", node);
            assert_eq!(start, last_end, "{} band does not abut its predecessor", node);
            last_end = end;
        }
        assert_eq!(last_end, 100);
    }

    #[test]
    fn test_completeness_exactly_at_threshold_skips_clarification() {
        let s = session().with_completeness(80, vec![], vec![]);
        assert_eq!(
            successor(NodeId::AnalyzeCompleteness, &s, &config()),
            Transition::Next(NodeId::IdentifyTechGaps)
        );
    }

    #[test]
    fn test_below_threshold_routes_to_clarification() {
        let s = session().with_completeness(79, vec!["timeline".to_string()], vec![]);
        assert_eq!(
            successor(NodeId::AnalyzeCompleteness, &s, &config()),
            Transition::Next(NodeId::AskUserClarification)
        );
    }

    #[test]
    fn test_clarification_rounds_are_bounded() {
        let mut s = session().with_completeness(50, vec![], vec![]);
        s.clarification_rounds = 2;
        assert_eq!(
            successor(NodeId::AnalyzeCompleteness, &s, &config()),
            Transition::Next(NodeId::IdentifyTechGaps)
        );
    }

    #[test]
    fn test_zero_gaps_skip_research_phase() {
        let s = session();
        assert_eq!(
            successor(NodeId::IdentifyTechGaps, &s, &config()),
            Transition::Next(NodeId::ParseAiStudioCode)
        );
    }

    #[test]
    fn test_gaps_route_to_research() {
        let s = session().with_gaps(vec![TechGap {
            category: TechCategory::Database,
            description: String::new(),
            priority: GapPriority::High,
            impact: String::new(),
            candidate_hints: Vec::new(),
        }]);
        assert_eq!(
            successor(NodeId::IdentifyTechGaps, &s, &config()),
            Transition::Next(NodeId::ResearchTechnologies)
        );
    }

    #[test]
    fn test_trd_score_exactly_90_proceeds() {
        let mut s = session();
        s.validation_report = Some(report(90, true, false));
        assert_eq!(
            successor(NodeId::ValidateTrd, &s, &config()),
            Transition::Next(NodeId::GenerateApiSpec)
        );
    }

    #[test]
    fn test_failed_validation_regenerates() {
        let mut s = session();
        s.validation_report = Some(report(82, false, false));
        assert_eq!(
            successor(NodeId::ValidateTrd, &s, &config()),
            Transition::Next(NodeId::GenerateTrd)
        );
    }

    #[test]
    fn test_forced_pass_proceeds() {
        let mut s = session();
        s.validation_report = Some(report(70, false, true));
        assert_eq!(
            successor(NodeId::ValidateTrd, &s, &config()),
            Transition::Next(NodeId::GenerateApiSpec)
        );
    }

    #[test]
    fn test_suspending_nodes() {
        let suspending: Vec<&NodeId> = NodeId::ALL.iter().filter(|n| n.suspends().is_some()).collect();
        assert_eq!(suspending.len(), 3);
    }
}
