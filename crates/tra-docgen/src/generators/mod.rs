//! The five artifact generators.

use crate::error::{DocgenError, DocgenResult};
use crate::fallback::architecture_fallback;
use crate::util::{extract_json_block, section_body, strip_fence};
use serde::Deserialize;
use std::sync::Arc;
use tra_core::artifact::model::SqlSchema;
use tra_core::config::LlmConfig;
use tra_core::gap::model::TechCategory;
use tra_core::session::model::Session;
use tra_gateway::{CompletionRequest, LlmGateway};
use tracing::{debug, warn};

static TRD_TEMPLATE: &str = include_str!("../templates/trd.tera");
static OPENAPI_TEMPLATE: &str = include_str!("../templates/openapi.tera");
static DB_SCHEMA_TEMPLATE: &str = include_str!("../templates/db_schema.tera");
static ARCHITECTURE_TEMPLATE: &str = include_str!("../templates/architecture.tera");
static TECH_STACK_TEMPLATE: &str = include_str!("../templates/tech_stack.tera");

/// Required TRD top-level sections, in order.
pub const TRD_SECTIONS: &[&str] = &[
    "Project Overview",
    "Technology Stack",
    "System Architecture",
    "API Specification",
    "Database Schema",
    "Security Requirements",
    "Performance Requirements",
    "Deployment Strategy",
    "Testing Strategy",
    "Development Guidelines",
];

/// Layer names every architecture diagram must carry.
pub const ARCHITECTURE_LAYERS: &[&str] = &[
    "Client",
    "Gateway",
    "Services",
    "Data",
    "External",
    "Monitoring",
];

/// The artifact variants in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Trd,
    OpenApi,
    SqlErd,
    Architecture,
    TechStack,
}

/// Architecture generation result; the diagram is always usable.
#[derive(Debug, Clone)]
pub struct ArchitectureOutcome {
    pub diagram: String,
    /// Set when the deterministic fallback replaced the LLM output.
    pub fallback_reason: Option<String>,
}

/// Generates the five output artifacts from the session context.
pub struct DocumentGenerators {
    llm: Arc<dyn LlmGateway>,
    llm_config: LlmConfig,
}

impl DocumentGenerators {
    pub fn new(llm: Arc<dyn LlmGateway>, llm_config: LlmConfig) -> Self {
        Self { llm, llm_config }
    }

    async fn complete(&self, prompt: String) -> DocgenResult<String> {
        let completion = self
            .llm
            .complete(CompletionRequest {
                prompt,
                model: self.llm_config.model.clone(),
                temperature: self.llm_config.temperature,
                max_tokens: self.llm_config.max_tokens,
            })
            .await?;
        Ok(completion.text)
    }

    fn base_context(session: &Session) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("selected", &session.selected_technologies);
        context.insert(
            "endpoints",
            &session
                .inferred_api
                .as_ref()
                .map(|api| api.endpoints.clone())
                .unwrap_or_default(),
        );
        context
    }

    /// Generate the TRD draft.
    pub async fn generate_trd(&self, session: &Session) -> DocgenResult<String> {
        let mut context = Self::base_context(session);
        context.insert("sections", TRD_SECTIONS);
        context.insert("prd", &session.prd_text);
        context.insert("design_docs", &session.design_docs);
        context.insert("clarifications", "");

        let prompt = tera::Tera::one_off(TRD_TEMPLATE, &context, false)?;
        let text = self.complete(prompt).await?;
        debug!(chars = text.len(), "TRD draft generated");
        Ok(text)
    }

    /// Generate the OpenAPI document, validated to parse as a 3.x spec.
    pub async fn generate_openapi(&self, session: &Session) -> DocgenResult<String> {
        let trd = session.trd_draft.as_deref().unwrap_or_default();
        let mut context = Self::base_context(session);
        context.insert(
            "auth_technology",
            &session
                .selected_technologies
                .get(&TechCategory::Authentication)
                .map(|s| s.option_name.clone())
                .unwrap_or_else(|| "bearer token".to_string()),
        );
        context.insert(
            "trd_api_section",
            &section_body(trd, "API Specification").unwrap_or_default(),
        );

        let prompt = tera::Tera::one_off(OPENAPI_TEMPLATE, &context, false)?;
        let text = self.complete(prompt).await?;
        let json = extract_json_block(&text)
            .ok_or_else(|| DocgenError::BadOutput("OpenAPI output contains no JSON".to_string()))?;
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| DocgenError::BadOutput(format!("OpenAPI output is not valid JSON: {}", e)))?;

        let version = value
            .get("openapi")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if !version.starts_with("3.") {
            return Err(DocgenError::BadOutput(format!(
                "expected an OpenAPI 3.x document, got version '{}'",
                version
            )));
        }
        if !value.get("paths").map(|p| p.is_object()).unwrap_or(false) {
            return Err(DocgenError::BadOutput(
                "OpenAPI document has no paths object".to_string(),
            ));
        }

        serde_json::to_string_pretty(&value)
            .map_err(|e| DocgenError::BadOutput(e.to_string()))
    }

    /// Generate the SQL DDL plus ER diagram.
    pub async fn generate_db_schema(&self, session: &Session) -> DocgenResult<SqlSchema> {
        let trd = session.trd_draft.as_deref().unwrap_or_default();
        let mut context = tera::Context::new();
        context.insert(
            "database_technology",
            &session
                .selected_technologies
                .get(&TechCategory::Database)
                .map(|s| s.option_name.clone())
                .unwrap_or_else(|| "PostgreSQL".to_string()),
        );
        context.insert(
            "trd_db_section",
            &section_body(trd, "Database Schema").unwrap_or_default(),
        );
        context.insert(
            "trd_overview",
            &section_body(trd, "Project Overview").unwrap_or_default(),
        );

        let prompt = tera::Tera::one_off(DB_SCHEMA_TEMPLATE, &context, false)?;
        let text = self.complete(prompt).await?;
        let json = extract_json_block(&text)
            .ok_or_else(|| DocgenError::BadOutput("schema output contains no JSON".to_string()))?;

        #[derive(Deserialize)]
        struct SchemaOutput {
            ddl: String,
            erd: String,
        }
        let parsed: SchemaOutput = serde_json::from_str(json)
            .map_err(|e| DocgenError::BadOutput(format!("schema output is not valid JSON: {}", e)))?;

        if !parsed.ddl.to_uppercase().contains("CREATE TABLE") {
            return Err(DocgenError::BadOutput(
                "DDL output contains no CREATE TABLE statement".to_string(),
            ));
        }
        if !parsed.erd.contains("erDiagram") {
            return Err(DocgenError::BadOutput(
                "ER diagram output is not a mermaid erDiagram".to_string(),
            ));
        }

        Ok(SqlSchema {
            ddl: strip_fence(&parsed.ddl).to_string(),
            erd: strip_fence(&parsed.erd).to_string(),
        })
    }

    /// Generate the architecture diagram, substituting the deterministic
    /// fallback when the LLM fails or produces an unusable script.
    pub async fn generate_architecture(&self, session: &Session) -> ArchitectureOutcome {
        let trd = session.trd_draft.as_deref().unwrap_or_default();
        let mut context = Self::base_context(session);
        context.insert(
            "trd_architecture_section",
            &section_body(trd, "System Architecture").unwrap_or_default(),
        );

        let attempt = match tera::Tera::one_off(ARCHITECTURE_TEMPLATE, &context, false) {
            Ok(prompt) => self.complete(prompt).await,
            Err(e) => Err(DocgenError::Template(e)),
        };

        match attempt {
            Ok(text) => {
                let diagram = strip_fence(&text).to_string();
                let missing: Vec<&str> = ARCHITECTURE_LAYERS
                    .iter()
                    .filter(|layer| !diagram.contains(**layer))
                    .copied()
                    .collect();
                if diagram.contains("flowchart") && missing.is_empty() {
                    ArchitectureOutcome {
                        diagram,
                        fallback_reason: None,
                    }
                } else {
                    let reason = format!(
                        "generated diagram missing layers: {}",
                        if missing.is_empty() { "not a flowchart".to_string() } else { missing.join(", ") }
                    );
                    warn!(%reason, "substituting architecture fallback");
                    ArchitectureOutcome {
                        diagram: architecture_fallback(&session.selected_technologies),
                        fallback_reason: Some(reason),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "architecture generation failed; substituting fallback");
                ArchitectureOutcome {
                    diagram: architecture_fallback(&session.selected_technologies),
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Generate the tech-stack document.
    pub async fn generate_tech_stack(&self, session: &Session) -> DocgenResult<String> {
        let trd = session.trd_draft.as_deref().unwrap_or_default();
        let mut context = Self::base_context(session);
        context.insert(
            "trd_overview",
            &section_body(trd, "Project Overview").unwrap_or_default(),
        );

        let prompt = tera::Tera::one_off(TECH_STACK_TEMPLATE, &context, false)?;
        self.complete(prompt).await
    }
}
