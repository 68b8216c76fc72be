//! Final nodes: artifact persistence and downstream notification.

use crate::engine::Engine;
use crate::error::{EngineError, NodeError};
use tra_core::error::ErrorKind;
use tra_core::event::WorkflowEvent;
use tra_core::session::model::{Session, TranscriptRole};
use tracing::info;

/// Node 18: persist all artifacts with an incremented version.
pub fn save_to_db(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let version = engine.adapter.save_outputs(&session).map_err(|e| match e {
        EngineError::InputMissing(what) => NodeError::new(ErrorKind::InputMissing, what),
        other => NodeError::new(ErrorKind::PersistenceFailure, other.to_string()),
    })?;

    let mut session = session;
    session.artifact_version = Some(version);
    Ok(session.say(
        TranscriptRole::System,
        format!("Artifacts persisted as version {}.", version),
    ))
}

/// Node 19: emit the completion event for the downstream stage.
pub fn notify_next_agent(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let version = session.artifact_version.unwrap_or(0);
    engine.broadcaster.publish(
        &session.id,
        WorkflowEvent::WorkflowCompleted {
            session_id: session.id.clone(),
            version,
        },
    );
    info!(session_id = %session.id, version, "completion event emitted");
    Ok(session.say(
        TranscriptRole::System,
        "Workflow complete; downstream stage notified.",
    ))
}
