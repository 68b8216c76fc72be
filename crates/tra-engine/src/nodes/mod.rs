//! Node implementations, grouped by phase.

pub mod analysis;
pub mod code;
pub mod decisions;
pub mod documents;
pub mod fallbacks;
pub mod persistence;

use crate::engine::Engine;
use crate::error::NodeError;
use crate::graph::NodeId;
use tra_core::session::model::Session;

/// Dispatch one node against the current session.
pub async fn execute(
    engine: &Engine,
    node: NodeId,
    session: &Session,
) -> Result<Session, NodeError> {
    let session = session
        .clone()
        .enter_node(node.name(), node.phase());
    match node {
        NodeId::LoadInputs => analysis::load_inputs(engine, session),
        NodeId::AnalyzeCompleteness => analysis::analyze_completeness(engine, session).await,
        NodeId::AskUserClarification => analysis::ask_user_clarification(engine, session),
        NodeId::IdentifyTechGaps => analysis::identify_tech_gaps(engine, session).await,
        NodeId::ResearchTechnologies => decisions::research_technologies(engine, session).await,
        NodeId::PresentOptions => decisions::present_options(engine, session),
        NodeId::WaitUserDecision => decisions::wait_user_decision(engine, session),
        NodeId::ValidateDecision => decisions::validate_decision(engine, session),
        NodeId::WarnUser => decisions::warn_user(engine, session),
        NodeId::ParseAiStudioCode => code::parse_ai_studio_code(engine, session).await,
        NodeId::InferApiSpec => code::infer_api_spec(engine, session).await,
        NodeId::GenerateTrd => documents::generate_trd(engine, session).await,
        NodeId::ValidateTrd => documents::validate_trd(engine, session).await,
        NodeId::GenerateApiSpec => documents::generate_api_spec(engine, session).await,
        NodeId::GenerateDbSchema => documents::generate_db_schema(engine, session).await,
        NodeId::GenerateArchitecture => documents::generate_architecture(engine, session).await,
        NodeId::GenerateTechStackDoc => documents::generate_tech_stack(engine, session).await,
        NodeId::SaveToDb => persistence::save_to_db(engine, session),
        NodeId::NotifyNextAgent => persistence::notify_next_agent(engine, session),
    }
}

/// Deterministic degrade path for a node whose retries are exhausted on a
/// non-fatal error. `None` means the node has no degrade path and the
/// session fails.
pub fn degrade(
    engine: &Engine,
    node: NodeId,
    session: &Session,
    error: &NodeError,
) -> Option<Session> {
    let session = session.clone().enter_node(node.name(), node.phase());
    match node {
        NodeId::AnalyzeCompleteness => Some(analysis::degrade_completeness(engine, session, error)),
        NodeId::IdentifyTechGaps => Some(analysis::degrade_gaps(session, error)),
        NodeId::ParseAiStudioCode => Some(code::degrade_parse(session, error)),
        NodeId::InferApiSpec => Some(code::degrade_infer(session, error)),
        NodeId::GenerateTrd => Some(documents::degrade_trd(session, error)),
        NodeId::GenerateApiSpec => Some(documents::degrade_api_spec(session, error)),
        NodeId::GenerateDbSchema => Some(documents::degrade_db_schema(session, error)),
        NodeId::GenerateTechStackDoc => Some(documents::degrade_tech_stack(session, error)),
        _ => None,
    }
}
