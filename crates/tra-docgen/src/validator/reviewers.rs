//! Specialist reviewers: one rubric-driven LLM call per reviewer, run
//! concurrently.

use crate::error::{DocgenError, DocgenResult};
use crate::util::extract_json_block;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tra_core::artifact::model::{ReviewerKind, ReviewerScore};
use tra_core::config::LlmConfig;
use tra_gateway::{CompletionRequest, LlmGateway};

static REVIEWER_TEMPLATE: &str = include_str!("../templates/reviewer.tera");

fn rubric(kind: ReviewerKind) -> &'static str {
    match kind {
        ReviewerKind::Architecture => {
            "Judge the System Architecture section: are the layers complete, \
             are component responsibilities clear, do data flows match the API \
             and database sections, and is the selected stack reflected?"
        }
        ReviewerKind::Security => {
            "Judge the Security Requirements: authentication and authorization \
             coverage, secret handling, transport security, and whether the \
             chosen auth technology is applied consistently."
        }
        ReviewerKind::Performance => {
            "Judge the Performance Requirements: concrete latency/throughput \
             targets, caching strategy, and scalability considerations."
        }
        ReviewerKind::Api => {
            "Judge the API Specification: every endpoint has method, path, \
             request and response shapes; naming is consistent; error \
             responses are covered."
        }
        ReviewerKind::Database => {
            "Judge the Database Schema: entities cover the domain, keys and \
             relations are explicit, and the schema matches the API payloads."
        }
        ReviewerKind::Clarity => {
            "Judge overall clarity: unambiguous language, consistent \
             terminology, and whether a new engineer could implement from \
             this document alone."
        }
    }
}

#[derive(Deserialize)]
struct ReviewerOutput {
    score: f64,
    #[serde(default)]
    notes: Vec<String>,
}

async fn run_one(
    llm: &dyn LlmGateway,
    llm_config: &LlmConfig,
    kind: ReviewerKind,
    trd: &str,
) -> DocgenResult<ReviewerScore> {
    let mut context = tera::Context::new();
    context.insert("reviewer", kind.as_str());
    context.insert("rubric", rubric(kind));
    context.insert("trd", trd);
    let prompt = tera::Tera::one_off(REVIEWER_TEMPLATE, &context, false)?;

    let completion = llm
        .complete(CompletionRequest {
            prompt,
            model: llm_config.model.clone(),
            temperature: llm_config.temperature,
            max_tokens: llm_config.max_tokens,
        })
        .await?;

    let json = extract_json_block(&completion.text).ok_or_else(|| {
        DocgenError::BadOutput(format!("{} reviewer returned no JSON", kind.as_str()))
    })?;
    let output: ReviewerOutput = serde_json::from_str(json).map_err(|e| {
        DocgenError::BadOutput(format!("{} reviewer output invalid: {}", kind.as_str(), e))
    })?;

    Ok(ReviewerScore {
        reviewer: kind,
        score: output.score.clamp(0.0, 100.0).round() as u8,
        notes: output.notes,
    })
}

/// Run all six reviewers concurrently against the TRD.
pub async fn run_reviewers(
    llm: &Arc<dyn LlmGateway>,
    llm_config: &LlmConfig,
    trd: &str,
) -> DocgenResult<Vec<ReviewerScore>> {
    let futures = ReviewerKind::ALL
        .iter()
        .map(|kind| run_one(llm.as_ref(), llm_config, *kind, trd));
    join_all(futures).await.into_iter().collect()
}
