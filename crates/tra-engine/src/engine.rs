//! The workflow engine: dispatch, retry, checkpointing, cancellation, and
//! teardown.

use crate::broadcast::Broadcaster;
use crate::checkpoint::CheckpointStore;
use crate::error::{EngineError, EngineResult, NodeError};
use crate::graph::{self, NodeId, Transition};
use crate::nodes;
use crate::persist::PersistenceAdapter;
use crate::researcher::TechnologyResearcher;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tra_cache::Cache;
use tra_core::config::Config;
use tra_core::error::{ErrorKind, SessionError};
use tra_core::event::WorkflowEvent;
use tra_core::session::model::Session;
use tra_db::queries::checkpoints as checkpoint_queries;
use tra_db::Database;
use tra_docgen::validator::structural::StructuralOptions;
use tra_docgen::{DocumentGenerators, Validator, ValidatorOptions};
use tra_gateway::retry::backoff_delay;
use tra_gateway::{
    AnthropicGateway, CompletionRequest, GatewayError, LlmGateway, SearchGateway, TavilySearch,
};
use tra_parser::{ApiInferrer, CodeParser};
use tracing::{error, info, warn};

const NODE_MAX_ATTEMPTS: u32 = 3;

/// The workflow engine. One instance serves many sessions; each session is
/// driven cooperatively, one node at a time, checkpointing after every node.
pub struct Engine {
    pub(crate) config: Config,
    pub(crate) db: Database,
    pub(crate) cache: Cache,
    pub(crate) llm: Arc<dyn LlmGateway>,
    pub(crate) checkpoints: CheckpointStore,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) adapter: PersistenceAdapter,
    pub(crate) generators: DocumentGenerators,
    pub(crate) validator: Validator,
    pub(crate) researcher: TechnologyResearcher,
    pub(crate) parser: CodeParser,
    pub(crate) inferrer: ApiInferrer,
    cancels: Mutex<HashSet<String>>,
}

impl Engine {
    pub fn new(
        config: Config,
        db: Database,
        cache: Cache,
        llm: Arc<dyn LlmGateway>,
        search: Arc<dyn SearchGateway>,
    ) -> Self {
        let cache = if config.cache.enabled {
            cache
        } else {
            Cache::disabled()
        };
        let generators = DocumentGenerators::new(llm.clone(), config.llm.clone());
        let validator = Validator::new(
            llm.clone(),
            config.llm.clone(),
            ValidatorOptions {
                pass_threshold: config.workflow.trd_pass_threshold,
                max_iterations: config.workflow.max_trd_iterations,
                fast_fail_structural: 6,
                structural: StructuralOptions::default(),
            },
        );
        let researcher = TechnologyResearcher::new(
            llm.clone(),
            search,
            cache.clone(),
            config.llm.clone(),
            config.search.clone(),
            config.cache.clone(),
        );
        Self {
            checkpoints: CheckpointStore::new(db.clone()),
            broadcaster: Broadcaster::new(),
            adapter: PersistenceAdapter::new(db.clone()),
            generators,
            validator,
            researcher,
            parser: CodeParser::new(),
            inferrer: ApiInferrer::new(),
            cancels: Mutex::new(HashSet::new()),
            config,
            db,
            cache,
            llm,
        }
    }

    /// Production wiring: gateways built from environment API keys with the
    /// configured per-call timeouts.
    pub fn with_default_gateways(
        config: Config,
        db: Database,
        cache: Cache,
    ) -> Result<Self, GatewayError> {
        let llm = AnthropicGateway::from_env(Duration::from_secs(config.llm.timeout_secs))?;
        let search = TavilySearch::from_env(Duration::from_secs(config.search.timeout_secs))?;
        Ok(Self::new(config, db, cache, Arc::new(llm), Arc::new(search)))
    }

    /// One LLM call shaped by the configured model settings.
    pub(crate) async fn complete_llm(&self, prompt: String) -> Result<String, NodeError> {
        let completion = self
            .llm
            .complete(CompletionRequest {
                prompt,
                model: self.config.llm.model.clone(),
                temperature: self.config.llm.temperature,
                max_tokens: self.config.llm.max_tokens,
            })
            .await?;
        Ok(completion.text)
    }

    /// Drive the session until it suspends, completes, or fails.
    pub async fn run(&self, session_id: &str) -> EngineResult<()> {
        loop {
            if self.apply_pending_cancel(session_id)? {
                return Ok(());
            }

            let session = self
                .checkpoints
                .load(session_id)?
                .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
            if session.is_terminal() || session.paused {
                return Ok(());
            }

            let Some(node) = NodeId::parse(&session.stage) else {
                let unknown_stage = NodeError::new(
                    ErrorKind::PersistenceFailure,
                    format!("checkpoint carries unknown stage '{}'", session.stage),
                );
                self.fail_session(session, &unknown_stage)?;
                return Ok(());
            };

            let next_session = match self.run_node_with_retry(node, &session).await {
                Ok(next) => next,
                Err(node_error) => {
                    if node_error.kind == ErrorKind::Cancelled {
                        self.finish_cancelled(session)?;
                        return Ok(());
                    }
                    if node.is_critical() || node_error.kind.is_fatal() {
                        self.fail_session(session, &node_error)?;
                        return Ok(());
                    }
                    match nodes::degrade(self, node, &session, &node_error) {
                        Some(degraded) => degraded,
                        None => {
                            self.fail_session(session, &node_error)?;
                            return Ok(());
                        }
                    }
                }
            };

            let (_, band_end) = node.progress_band();
            let next_session = next_session.with_progress(band_end);
            let transition = graph::successor(node, &next_session, &self.config.workflow);

            match transition {
                Transition::Next(next_node) => {
                    let mut next_session = next_session;
                    next_session.stage = next_node.name().to_string();
                    self.checkpoint_and_report(&next_session, node)?;
                }
                Transition::Suspend(kind) => {
                    let suspended = next_session.suspend(kind);
                    self.checkpoint_and_report(&suspended, node)?;
                    info!(session_id, awaiting = kind.as_str(), "session suspended");
                    return Ok(());
                }
                Transition::Complete => {
                    let completed = next_session.complete();
                    self.checkpoint_and_report(&completed, node)?;
                    info!(session_id, "session completed");
                    return Ok(());
                }
            }
        }
    }

    async fn run_node_with_retry(
        &self,
        node: NodeId,
        session: &Session,
    ) -> Result<Session, NodeError> {
        let mut attempt = 1u32;
        loop {
            match nodes::execute(self, node, session).await {
                Ok(next) => return Ok(next),
                Err(e) if e.kind.is_retriable() && attempt < NODE_MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt, Duration::from_millis(200), None);
                    warn!(
                        session_id = %session.id,
                        node = node.name(),
                        attempt,
                        error = %e,
                        "node failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Checkpoint (retried; a persistent write failure is fatal) and emit
    /// the progress event.
    fn checkpoint_and_report(&self, session: &Session, executed: NodeId) -> EngineResult<()> {
        let mut attempt = 1u32;
        loop {
            match self.checkpoints.save(session) {
                Ok(_revision) => break,
                Err(e) if attempt < NODE_MAX_ATTEMPTS => {
                    warn!(session_id = %session.id, attempt, error = %e, "checkpoint write failed; retrying");
                    attempt += 1;
                }
                Err(e) => {
                    error!(session_id = %session.id, error = %e, "checkpoint write failed permanently");
                    self.broadcaster.publish(
                        &session.id,
                        WorkflowEvent::WorkflowFailed {
                            reason: format!("checkpoint_failure: {}", e),
                        },
                    );
                    return Err(e);
                }
            }
        }

        self.broadcaster.publish(
            &session.id,
            WorkflowEvent::ProgressUpdate {
                node: executed.name().to_string(),
                percentage: session.progress,
            },
        );
        Ok(())
    }

    fn fail_session(&self, session: Session, node_error: &NodeError) -> EngineResult<()> {
        error!(session_id = %session.id, error = %node_error, "session failed");
        let failed = session
            .record_error(SessionError::new(
                node_error.kind,
                "workflow",
                node_error.message.clone(),
            ))
            .fail(node_error.kind.as_str());
        self.checkpoints.save(&failed)?;
        self.broadcaster.publish(
            &failed.id,
            WorkflowEvent::WorkflowFailed {
                reason: node_error.to_string(),
            },
        );
        Ok(())
    }

    /// Record a cancellation request; it takes effect at the next checkpoint
    /// boundary (immediately, when the session is suspended).
    pub(crate) fn request_cancel(&self, session_id: &str) {
        if let Ok(mut cancels) = self.cancels.lock() {
            cancels.insert(session_id.to_string());
        }
    }

    /// Apply a pending cancel, if any. Returns true when the session reached
    /// a terminal state here.
    pub(crate) fn apply_pending_cancel(&self, session_id: &str) -> EngineResult<bool> {
        let requested = self
            .cancels
            .lock()
            .map(|mut cancels| cancels.remove(session_id))
            .unwrap_or(false);
        if !requested {
            return Ok(false);
        }
        let Some(session) = self.checkpoints.load(session_id)? else {
            return Ok(false);
        };
        if session.is_terminal() {
            return Ok(true);
        }
        self.finish_cancelled(session)?;
        Ok(true)
    }

    fn finish_cancelled(&self, session: Session) -> EngineResult<()> {
        info!(session_id = %session.id, "session cancelled");
        let cancelled = session
            .record_error(SessionError::new(
                ErrorKind::Cancelled,
                "workflow",
                "cancelled by operator request",
            ))
            .cancel();
        self.checkpoints.save(&cancelled)?;
        self.broadcaster.publish(
            &cancelled.id,
            WorkflowEvent::Warning {
                severity: tra_core::decision::model::WarningSeverity::Info,
                detail: "session cancelled".to_string(),
            },
        );
        Ok(())
    }

    /// Fail every non-terminal session whose last checkpoint is older than
    /// the configured idle window. Returns the evicted session ids.
    pub fn evict_idle(&self) -> EngineResult<Vec<String>> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(self.config.idle_timeout())
                .unwrap_or_else(|_| chrono::Duration::hours(1));
        let stale = checkpoint_queries::stale_sessions(&self.db, &cutoff.to_rfc3339())?;

        let mut evicted = Vec::new();
        for session_id in stale {
            let Some(session) = self.checkpoints.load(&session_id)? else {
                continue;
            };
            if session.is_terminal() {
                continue;
            }
            warn!(session_id = %session_id, "evicting idle session");
            self.fail_session(
                session,
                &NodeError::new(ErrorKind::IdleTimeout, "no node progress within the idle window"),
            )?;
            evicted.push(session_id);
        }
        Ok(evicted)
    }

    /// Cost counters for status surfaces: LLM spend plus cache hit/miss.
    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            llm: self.llm.metrics(),
            cache_hits: self.cache.metrics().hits(),
            cache_misses: self.cache.metrics().misses(),
        }
    }

    /// Ordered teardown: broadcaster first (no events after this point),
    /// then the cache, then the checkpoint store.
    pub fn close(&self) {
        self.broadcaster.close();
        self.cache.close();
        self.checkpoints.close();
        info!("engine closed");
    }
}

/// Aggregated cost counters across the engine's gateways and cache.
#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub llm: tra_gateway::MetricsSnapshot,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
