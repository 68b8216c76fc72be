//! Phase 1 nodes: input loading, completeness analysis, clarification, and
//! gap identification.

use crate::engine::Engine;
use crate::error::{EngineError, NodeError};
use serde::Deserialize;
use tra_core::error::{ErrorKind, SessionError};
use tra_core::event::WorkflowEvent;
use tra_core::gap::model::{GapPriority, TechCategory, TechGap};
use tra_core::gap::normalize_gaps;
use tra_core::session::model::{Session, TranscriptRole};
use tracing::info;

static COMPLETENESS_TEMPLATE: &str = include_str!("../templates/completeness.tera");
static GAPS_TEMPLATE: &str = include_str!("../templates/gaps.tera");

/// Node 1: fetch PRD and design docs via the persistence adapter.
pub fn load_inputs(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let inputs = engine.adapter.load_inputs(&session.design_job_id).map_err(|e| match e {
        EngineError::UpstreamIncomplete(id) => NodeError::new(
            ErrorKind::UpstreamIncomplete,
            format!("design job {} has not completed", id),
        ),
        EngineError::InputMissing(what) => NodeError::new(ErrorKind::InputMissing, what),
        other => NodeError::new(ErrorKind::PersistenceFailure, other.to_string()),
    })?;

    info!(
        session_id = %session.id,
        docs = inputs.design_docs.len(),
        has_archive = inputs.code_archive_path.is_some(),
        "inputs loaded"
    );

    let mut session = session.with_inputs(inputs.prd_text, inputs.design_docs);
    if session.code_archive_path.is_none() {
        session.code_archive_path = inputs.code_archive_path;
    }
    Ok(session.say(TranscriptRole::System, "Inputs loaded from design stage."))
}

#[derive(Deserialize)]
struct CompletenessOutput {
    score: u8,
    #[serde(default)]
    missing: Vec<String>,
    #[serde(default)]
    ambiguous: Vec<String>,
    #[serde(default)]
    questions: Vec<String>,
}

/// Node 2: compute the completeness score and missing/ambiguous lists.
///
/// Re-entry after a clarification round never lowers the score.
pub async fn analyze_completeness(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let mut context = tera::Context::new();
    context.insert("prd", &session.prd_text);
    context.insert("design_docs", &session.design_docs);
    let prompt = tera::Tera::one_off(COMPLETENESS_TEMPLATE, &context, false)
        .map_err(|e| NodeError::new(ErrorKind::LlmMalformedOutput, e.to_string()))?;

    let completion = engine.complete_llm(prompt).await?;
    let json = tra_docgen::util::extract_json_block(&completion).ok_or_else(|| {
        NodeError::new(ErrorKind::LlmMalformedOutput, "completeness output contains no JSON")
    })?;
    let output: CompletenessOutput = serde_json::from_str(json)
        .map_err(|e| NodeError::new(ErrorKind::LlmMalformedOutput, e.to_string()))?;

    let score = output.score.min(100).max(session.completeness_score);
    info!(session_id = %session.id, score, "completeness analyzed");
    Ok(session
        .with_completeness(score, output.missing, output.ambiguous)
        .with_questions(output.questions))
}

/// Fallback clarification questions when the analysis produced fewer than
/// three.
const DEFAULT_QUESTIONS: &[&str] = &[
    "Who are the primary users and what is the expected user count?",
    "Which features are must-have for the first release?",
    "Are there constraints on hosting, budget, or compliance?",
];

/// Node 3: surface 3-5 clarification questions, then suspend.
pub fn ask_user_clarification(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let mut questions = session.clarification_questions.clone();
    for fallback in DEFAULT_QUESTIONS {
        if questions.len() >= 3 {
            break;
        }
        if !questions.iter().any(|q| q == fallback) {
            questions.push((*fallback).to_string());
        }
    }
    questions.truncate(5);

    let rendered = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");
    let text = format!(
        "The inputs score {}/100 for completeness. Please answer:\n{}",
        session.completeness_score, rendered
    );

    engine.broadcaster.publish(
        &session.id,
        WorkflowEvent::AgentMessage {
            text: text.clone(),
            data: Some(serde_json::json!({ "questions": questions })),
        },
    );
    Ok(session
        .with_questions(questions)
        .say(TranscriptRole::Agent, text))
}

#[derive(Deserialize)]
struct GapOutput {
    #[serde(default)]
    gaps: Vec<RawGap>,
}

#[derive(Deserialize)]
struct RawGap {
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    impact: String,
    #[serde(default)]
    hints: Vec<String>,
}

/// Node 4: enumerate technology gaps from the closed category set.
pub async fn identify_tech_gaps(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let categories = TechCategory::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut context = tera::Context::new();
    context.insert("prd", &session.prd_text);
    context.insert("design_docs", &session.design_docs);
    context.insert("categories", &categories);
    let prompt = tera::Tera::one_off(GAPS_TEMPLATE, &context, false)
        .map_err(|e| NodeError::new(ErrorKind::LlmMalformedOutput, e.to_string()))?;

    let completion = engine.complete_llm(prompt).await?;
    let json = tra_docgen::util::extract_json_block(&completion).ok_or_else(|| {
        NodeError::new(ErrorKind::LlmMalformedOutput, "gap output contains no JSON")
    })?;
    let output: GapOutput = serde_json::from_str(json)
        .map_err(|e| NodeError::new(ErrorKind::LlmMalformedOutput, e.to_string()))?;

    // Unknown category tags are discarded; the set is closed.
    let gaps: Vec<TechGap> = output
        .gaps
        .into_iter()
        .filter_map(|raw| {
            TechCategory::parse(&raw.category).map(|category| TechGap {
                category,
                description: raw.description,
                priority: GapPriority::parse(&raw.priority),
                impact: raw.impact,
                candidate_hints: raw.hints,
            })
        })
        .collect();
    let gaps = normalize_gaps(gaps);

    info!(session_id = %session.id, gaps = gaps.len(), "tech gaps identified");
    let summary = if gaps.is_empty() {
        "No technology gaps found; all categories are already decided.".to_string()
    } else {
        format!(
            "Identified {} technology gap(s): {}.",
            gaps.len(),
            gaps.iter()
                .map(|g| g.category.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    engine.broadcaster.publish(
        &session.id,
        WorkflowEvent::AgentMessage {
            text: summary.clone(),
            data: None,
        },
    );
    Ok(session.with_gaps(gaps).say(TranscriptRole::Agent, summary))
}

/// Degrade path: an unassessable input set proceeds at the threshold score
/// with the failure on record.
pub fn degrade_completeness(engine: &Engine, session: Session, error: &NodeError) -> Session {
    let threshold = engine.config.workflow.completeness_threshold;
    let score = session.completeness_score.max(threshold);
    session
        .with_completeness(
            score,
            vec!["completeness analysis unavailable".to_string()],
            Vec::new(),
        )
        .record_error(SessionError::new(
            error.kind,
            "analyze_completeness",
            error.message.clone(),
        ))
}

/// Degrade path: continue without gaps, leaving the failure on record.
pub fn degrade_gaps(session: Session, error: &NodeError) -> Session {
    session.with_gaps(Vec::new()).record_error(SessionError::new(
        error.kind,
        "identify_tech_gaps",
        error.message.clone(),
    ))
}
