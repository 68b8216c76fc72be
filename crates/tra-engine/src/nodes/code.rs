//! Phase 3 nodes: code-archive parsing and API inference.

use crate::engine::Engine;
use crate::error::NodeError;
use std::path::Path;
use std::time::Duration;
use tra_cache::{api_inference_key, code_analysis_key};
use tra_core::code::model::{ApiModel, ParsedCodeModel};
use tra_core::error::{ErrorKind, SessionError};
use tra_core::session::model::{Session, TranscriptRole};
use tra_parser::ApiInferrer;
use tracing::info;

/// Node 10: parse the uploaded archive when a path is set; skip otherwise.
pub async fn parse_ai_studio_code(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let Some(archive_path) = session.code_archive_path.clone() else {
        info!(session_id = %session.id, "no code archive; skipping parse");
        return Ok(session);
    };

    let digest = engine.parser.archive_digest(Path::new(&archive_path));
    let key = code_analysis_key(&digest);
    let model = match engine.cache.get_json::<ParsedCodeModel>(&key).await {
        Some(model) => model,
        None => {
            let model = engine.parser.parse(Path::new(&archive_path));
            engine
                .cache
                .set_json(
                    &key,
                    &model,
                    Duration::from_secs(engine.config.cache.code_ttl_secs),
                )
                .await;
            model
        }
    };

    let mut session = session;
    // Per-file parse failures are warnings, not workflow errors.
    for skipped in &model.skipped_files {
        engine.broadcaster.publish(
            &session.id,
            tra_core::event::WorkflowEvent::Warning {
                severity: tra_core::decision::model::WarningSeverity::Warning,
                detail: format!("skipped {}: {}", skipped.file, skipped.reason),
            },
        );
        session = session.record_error(SessionError::new(
            ErrorKind::ParseError,
            "parse_ai_studio_code",
            format!("{}: {}", skipped.file, skipped.reason),
        ));
    }
    let summary = format!(
        "Parsed code archive: {} component(s), {} API call(s), {} import(s).",
        model.components.len(),
        model.api_calls.len(),
        model.imports.len()
    );
    session.parsed_code = Some(model);
    Ok(session.say(TranscriptRole::System, summary))
}

/// Node 11: merge parser output with document hints into the endpoint list.
pub async fn infer_api_spec(engine: &Engine, session: Session) -> Result<Session, NodeError> {
    let parsed = session.parsed_code.clone().unwrap_or_default();
    let digest = ApiInferrer::components_digest(&parsed);
    let key = api_inference_key(&digest);

    let model = match engine.cache.get_json::<ApiModel>(&key).await {
        Some(model) => model,
        None => {
            let model = engine
                .inferrer
                .infer(&parsed, &session.prd_text, &session.design_docs);
            engine
                .cache
                .set_json(
                    &key,
                    &model,
                    Duration::from_secs(engine.config.cache.api_ttl_secs),
                )
                .await;
            model
        }
    };

    info!(session_id = %session.id, endpoints = model.endpoints.len(), "API model inferred");
    let summary = format!("Inferred {} API endpoint(s).", model.endpoints.len());
    let mut session = session;
    session.inferred_api = Some(model);
    Ok(session.say(TranscriptRole::System, summary))
}

/// Degrade path: continue with an empty parse model.
pub fn degrade_parse(session: Session, error: &NodeError) -> Session {
    let mut session = session.record_error(SessionError::new(
        ErrorKind::ParseError,
        "parse_ai_studio_code",
        error.message.clone(),
    ));
    session.parsed_code = Some(ParsedCodeModel::default());
    session
}

/// Degrade path: continue with an empty API model.
pub fn degrade_infer(session: Session, error: &NodeError) -> Session {
    let mut session = session.record_error(SessionError::new(
        error.kind,
        "infer_api_spec",
        error.message.clone(),
    ));
    session.inferred_api = Some(ApiModel::default());
    session
}
