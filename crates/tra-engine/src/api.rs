//! Façade-facing operations: start, status, event submission, cancel, and
//! output retrieval.
//!
//! Resuming is event application: each submit operation applies the typed
//! event to the checkpointed session, points the checkpoint at the next
//! node, and re-enters the run loop.

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::graph::{self, NodeId, Transition};
use tokio::sync::broadcast;
use tra_core::decision::model::WarningAction;
use tra_core::event::WorkflowEvent;
use tra_core::gap::model::TechCategory;
use tra_core::session::model::{AwaitKind, Session, TranscriptRole};
use tra_db::queries::{artifacts, sessions};
use tracing::info;
use uuid::Uuid;

/// Inputs for starting a session.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub project_id: String,
    pub user_id: String,
    pub design_job_id: String,
    pub code_archive_path: Option<String>,
}

/// Queryable session summary.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub session_id: String,
    pub phase: String,
    pub stage: String,
    pub progress: u8,
    pub paused: bool,
    pub awaiting: Option<String>,
}

/// The latest persisted artifact bundle.
#[derive(Debug, Clone)]
pub struct SessionOutputs {
    pub session_id: String,
    pub version: i64,
    pub trd: String,
    pub openapi: String,
    pub sql_ddl: String,
    pub erd: String,
    pub architecture: String,
    pub tech_stack: String,
    pub validation_report: serde_json::Value,
}

impl Engine {
    /// Create a new session positioned at the first node. The caller (or a
    /// spawned task) drives it with [`Engine::run`].
    pub fn start(&self, request: StartRequest) -> EngineResult<String> {
        let session_id = Uuid::new_v4().to_string();
        sessions::create_session(
            &self.db,
            &session_id,
            &request.project_id,
            &request.user_id,
            &request.design_job_id,
        )?;

        let mut session = Session::new(
            session_id.clone(),
            request.project_id,
            request.user_id,
            request.design_job_id,
            request.code_archive_path,
        );
        session.stage = NodeId::LoadInputs.name().to_string();
        self.checkpoints.save(&session)?;

        self.broadcaster.publish(
            &session_id,
            WorkflowEvent::WorkflowStarted {
                session_id: session_id.clone(),
            },
        );
        info!(session_id = %session_id, "session started");
        Ok(session_id)
    }

    /// The full session record from its latest checkpoint.
    pub fn session_snapshot(&self, session_id: &str) -> EngineResult<Session> {
        self.checkpoints
            .load(session_id)?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    /// Current phase, progress, and pending predicate.
    pub fn status(&self, session_id: &str) -> EngineResult<SessionStatus> {
        let row = sessions::get_session(&self.db, session_id).map_err(|e| match e {
            tra_db::StoreError::Missing(_) => EngineError::SessionNotFound(session_id.to_string()),
            other => EngineError::Store(other),
        })?;
        Ok(SessionStatus {
            session_id: row.id,
            phase: row.phase,
            stage: row.stage,
            progress: row.progress.clamp(0, 100) as u8,
            paused: row.paused,
            awaiting: row.awaiting,
        })
    }

    fn load_awaiting(&self, session_id: &str, expected: AwaitKind) -> EngineResult<Session> {
        let session = self
            .checkpoints
            .load(session_id)?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        if session.is_terminal() {
            return Err(EngineError::Terminal(session_id.to_string()));
        }
        if !session.paused || session.awaiting != Some(expected) {
            return Err(EngineError::NotAwaiting {
                session_id: session_id.to_string(),
                expected: expected.as_str(),
            });
        }
        Ok(session)
    }

    /// Resume an `ask_user_clarification` suspension with the user's answers.
    pub async fn submit_clarifications(
        &self,
        session_id: &str,
        answers: Vec<String>,
    ) -> EngineResult<()> {
        let session = self.load_awaiting(session_id, AwaitKind::Clarification)?;
        let mut session = session.resume().apply_clarifications(answers);
        session.stage = NodeId::AnalyzeCompleteness.name().to_string();
        self.checkpoints.save(&session)?;
        info!(session_id, "clarifications applied");
        self.run(session_id).await
    }

    /// Resume a `wait_user_decision` suspension with the selected option.
    pub async fn submit_decision(
        &self,
        session_id: &str,
        category: &str,
        option_name: &str,
        rationale: Option<String>,
    ) -> EngineResult<()> {
        let parsed = TechCategory::parse(category)
            .ok_or_else(|| EngineError::UnknownCategory(category.to_string()))?;
        let session = self.load_awaiting(session_id, AwaitKind::Decision)?;

        let mut session = session
            .resume()
            .say(
                TranscriptRole::User,
                format!("Selected {} for {}.", option_name, parsed),
            )
            .apply_decision(parsed, option_name, rationale)?;
        session.stage = NodeId::ValidateDecision.name().to_string();
        self.checkpoints.save(&session)?;
        info!(session_id, category, option_name, "decision applied");
        self.run(session_id).await
    }

    /// Resume a `warn_user` suspension with reselect-or-proceed.
    pub async fn resolve_warning(
        &self,
        session_id: &str,
        action: WarningAction,
    ) -> EngineResult<()> {
        let session = self.load_awaiting(session_id, AwaitKind::WarningResolution)?;
        let mut session = session.resume();

        let category = session.last_decision;
        let effective = match (action, category) {
            (WarningAction::Reselect, Some(category))
                if session.conflict_rounds_for(category)
                    >= self.config.workflow.max_conflict_rounds =>
            {
                // Conflict-resolution budget exhausted; the selection stands.
                self.broadcaster.publish(
                    session_id,
                    WorkflowEvent::Warning {
                        severity: tra_core::decision::model::WarningSeverity::Warning,
                        detail: format!(
                            "conflict resolution budget exhausted for {}; proceeding with current selection",
                            category
                        ),
                    },
                );
                WarningAction::Proceed
            }
            _ => action,
        };

        if let Some(category) = category {
            session = session.count_conflict_round(category);
        }

        match effective {
            WarningAction::Reselect => {
                let Some(category) = category else {
                    return Err(EngineError::NotAwaiting {
                        session_id: session_id.to_string(),
                        expected: "warning-resolution",
                    });
                };
                session = session
                    .retract_selection(category)
                    .with_warnings(Vec::new())
                    .say(
                        TranscriptRole::User,
                        format!("Reselecting {} after conflict warning.", category),
                    );
                session.stage = NodeId::PresentOptions.name().to_string();
            }
            WarningAction::Proceed => {
                session = session.with_warnings(Vec::new()).say(
                    TranscriptRole::User,
                    "Proceeding despite the conflict warning.",
                );
                let next = match graph::after_decision_settled(&session) {
                    Transition::Next(node) => node,
                    _ => NodeId::ParseAiStudioCode,
                };
                session.stage = next.name().to_string();
            }
        }

        self.checkpoints.save(&session)?;
        info!(session_id, action = ?effective, "warning resolved");
        self.run(session_id).await
    }

    /// Request cancellation; it lands at the next checkpoint boundary, which
    /// is immediate for suspended or idle sessions.
    pub fn cancel(&self, session_id: &str) -> EngineResult<()> {
        self.request_cancel(session_id);
        self.apply_pending_cancel(session_id)?;
        Ok(())
    }

    /// Latest-version artifact bundle.
    pub fn fetch_outputs(&self, session_id: &str) -> EngineResult<SessionOutputs> {
        let row = artifacts::latest_artifacts(&self.db, session_id).map_err(|e| match e {
            tra_db::StoreError::Missing(_) => EngineError::SessionNotFound(session_id.to_string()),
            other => EngineError::Store(other),
        })?;
        Ok(SessionOutputs {
            session_id: row.session_id,
            version: row.version,
            trd: row.trd,
            openapi: row.openapi,
            sql_ddl: row.sql_ddl,
            erd: row.erd,
            architecture: row.architecture,
            tech_stack: row.tech_stack,
            validation_report: serde_json::from_str(&row.validation_report)
                .unwrap_or(serde_json::Value::Null),
        })
    }

    /// Attach a listener to the session's event stream: replay plus live
    /// receiver.
    pub fn subscribe(
        &self,
        session_id: &str,
    ) -> (Vec<WorkflowEvent>, broadcast::Receiver<WorkflowEvent>) {
        self.broadcaster.subscribe(session_id)
    }
}
