//! Persistence adapter: read upstream inputs, write versioned outputs.

use crate::error::{EngineError, EngineResult};
use std::collections::BTreeMap;
use tra_core::session::model::Session;
use tra_db::queries::{artifacts, design_jobs};
use tra_db::Database;
use tracing::info;

/// Loaded upstream inputs for one design job.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub prd_text: String,
    pub design_docs: BTreeMap<String, String>,
    pub code_archive_path: Option<String>,
}

/// Bridges the engine to the relational store.
#[derive(Clone)]
pub struct PersistenceAdapter {
    db: Database,
}

impl PersistenceAdapter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Read PRD and design documents from the upstream job record.
    ///
    /// The job must have reached `completed`; the PRD must be non-empty.
    pub fn load_inputs(&self, design_job_id: &str) -> EngineResult<LoadedInputs> {
        let job = design_jobs::get_job(&self.db, design_job_id).map_err(|e| match e {
            tra_db::StoreError::Missing(_) => {
                EngineError::InputMissing(format!("design job {}", design_job_id))
            }
            other => EngineError::Store(other),
        })?;

        if job.status != "completed" {
            return Err(EngineError::UpstreamIncomplete(design_job_id.to_string()));
        }
        if job.prd_text.trim().is_empty() {
            return Err(EngineError::InputMissing("PRD text is empty".to_string()));
        }

        let design_docs: BTreeMap<String, String> = serde_json::from_str(&job.design_docs)
            .map_err(|e| EngineError::InputMissing(format!("design docs malformed: {}", e)))?;

        Ok(LoadedInputs {
            prd_text: job.prd_text,
            design_docs,
            code_archive_path: job.code_archive_path,
        })
    }

    /// Write the five artifacts plus the validation report as a new version.
    pub fn save_outputs(&self, session: &Session) -> EngineResult<i64> {
        let trd = session
            .trd_draft
            .as_deref()
            .ok_or_else(|| EngineError::InputMissing("TRD draft not generated".to_string()))?;
        let openapi = session
            .openapi_spec
            .as_deref()
            .ok_or_else(|| EngineError::InputMissing("OpenAPI spec not generated".to_string()))?;
        let schema = session
            .db_schema
            .as_ref()
            .ok_or_else(|| EngineError::InputMissing("DB schema not generated".to_string()))?;
        let architecture = session
            .architecture_diagram
            .as_deref()
            .ok_or_else(|| EngineError::InputMissing("architecture diagram not generated".to_string()))?;
        let tech_stack = session
            .tech_stack_doc
            .as_deref()
            .ok_or_else(|| EngineError::InputMissing("tech-stack doc not generated".to_string()))?;
        let validation = session
            .validation_report
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?
            .unwrap_or_else(|| "{}".to_string());

        let version = artifacts::save_artifacts(
            &self.db,
            &session.id,
            &artifacts::NewArtifacts {
                trd,
                openapi,
                sql_ddl: &schema.ddl,
                erd: &schema.erd,
                architecture,
                tech_stack,
                validation_report: &validation,
            },
        )?;
        info!(session_id = %session.id, version, "artifacts persisted");
        Ok(version)
    }
}
