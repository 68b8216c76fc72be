//! Phase 2 nodes: research fan-out and the per-gap decide/validate/warn loop.

use crate::engine::Engine;
use crate::error::NodeError;
use crate::researcher::ResearchContext;
use futures::future::join_all;
use tra_core::decision::validate_decision as check_conflicts;
use tra_core::event::WorkflowEvent;
use tra_core::session::model::{Session, TranscriptRole};
use tracing::info;

/// Node 5: research every gap, cache-first, bounded fan-out.
pub async fn research_technologies(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let existing_stack: Vec<String> = session
        .selected_technologies
        .values()
        .map(|s| s.option_name.clone())
        .collect();
    let context = ResearchContext::from_inputs(&session.prd_text, existing_stack);

    let parallelism = engine.config.research.parallelism.max(1);
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for chunk in session.tech_gaps.chunks(parallelism) {
        let outcomes = join_all(
            chunk
                .iter()
                .map(|gap| engine.researcher.research(gap, &context)),
        )
        .await;
        for outcome in outcomes {
            results.push(outcome.result);
            if let Some(error) = outcome.error {
                errors.push(error);
            }
        }
    }

    info!(
        session_id = %session.id,
        researched = results.len(),
        degraded = errors.len(),
        "technology research finished"
    );
    let mut session = session.with_research(results);
    for error in errors {
        session = session.record_error(error);
    }
    Ok(session)
}

fn render_options(session: &Session) -> Option<(String, Vec<String>)> {
    let category = session.next_pending()?;
    let research = session.research_for(category)?;

    let mut lines = vec![format!("Please choose a {} technology:", category)];
    if research.options.is_empty() {
        lines.push(research.summary.clone());
    }
    for (index, option) in research.options.iter().enumerate() {
        lines.push(format!(
            "{}. {} — {} (popularity {}, learning curve {:?})",
            index + 1,
            option.name,
            option.description,
            option.popularity,
            option.learning_curve
        ));
        if !option.strengths.is_empty() {
            lines.push(format!("   strengths: {}", option.strengths.join("; ")));
        }
        if !option.weaknesses.is_empty() {
            lines.push(format!("   weaknesses: {}", option.weaknesses.join("; ")));
        }
    }
    if let Some(recommendation) = &research.recommendation {
        lines.push(format!("Recommended: {}", recommendation));
    }

    let names = research.options.iter().map(|o| o.name.clone()).collect();
    Some((lines.join("\n"), names))
}

/// Node 6: render the next undecided gap to the transcript.
pub fn present_options(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let Some((text, _names)) = render_options(&session) else {
        return Ok(session);
    };
    engine.broadcaster.publish(
        &session.id,
        WorkflowEvent::AgentMessage {
            text: text.clone(),
            data: None,
        },
    );
    Ok(session.say(TranscriptRole::Agent, text))
}

/// Node 7: announce the awaited decision; the engine suspends after this.
pub fn wait_user_decision(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    if let Some(category) = session.next_pending() {
        let options = session
            .research_for(category)
            .map(|r| r.options.iter().map(|o| o.name.clone()).collect())
            .unwrap_or_default();
        engine.broadcaster.publish(
            &session.id,
            WorkflowEvent::WaitingUserDecision { category, options },
        );
    }
    Ok(session)
}

/// Node 8: check the latest decision against prior selections and recorded
/// requirements.
pub fn validate_decision(_engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let Some(category) = session.last_decision else {
        return Ok(session.with_warnings(Vec::new()));
    };
    let Some(choice) = session.selected_technologies.get(&category) else {
        return Ok(session.with_warnings(Vec::new()));
    };

    let warnings = check_conflicts(
        category,
        &choice.option_name,
        &session.selected_technologies,
        &session.prd_text,
    );
    info!(
        session_id = %session.id,
        category = %category,
        conflicts = warnings.len(),
        "decision validated"
    );
    Ok(session.with_warnings(warnings))
}

/// Node 9: surface conflict warnings; the engine suspends for
/// reselect-or-proceed.
pub fn warn_user(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let mut session = session;
    let warnings = session.decision_warnings.clone();
    for warning in &warnings {
        engine.broadcaster.publish(
            &session.id,
            WorkflowEvent::Warning {
                severity: warning.severity,
                detail: format!("{} ({})", warning.explanation, warning.remedy),
            },
        );
        session = session.say(
            TranscriptRole::Agent,
            format!(
                "Warning [{}] on {} = {}: {} Suggested remedy: {}",
                warning.severity.as_str(),
                warning.category,
                warning.option_name,
                warning.explanation,
                warning.remedy
            ),
        );
    }
    Ok(session)
}
