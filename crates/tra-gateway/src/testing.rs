//! Scripted gateway doubles.
//!
//! The LLM and search gateways are the test seam for determinism: workflow
//! tests script fixed outputs keyed by prompt content and replay them.

use crate::error::{GatewayError, GatewayResult};
use crate::llm::{Completion, CompletionRequest, GatewayMetrics, LlmGateway, MetricsSnapshot};
use crate::search::{SearchGateway, SearchHit, SearchQuery};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Rule {
    needle: String,
    responses: VecDeque<String>,
    last: Option<String>,
}

/// An LLM double that answers by matching a substring of the prompt.
///
/// Rules added with [`respond`](Self::respond) repeat forever; rules added
/// with [`respond_seq`](Self::respond_seq) play their responses in order and
/// then repeat the final one. Prompts matching no rule fail with
/// `malformed_output`, which surfaces missing scripting immediately.
pub struct ScriptedLlm {
    rules: Mutex<Vec<Rule>>,
    calls: AtomicU64,
    metrics: Arc<GatewayMetrics>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
            metrics: Arc::new(GatewayMetrics::default()),
        }
    }

    /// Always answer `response` for prompts containing `needle`.
    pub fn respond(self, needle: &str, response: &str) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            rules.push(Rule {
                needle: needle.to_string(),
                responses: VecDeque::new(),
                last: Some(response.to_string()),
            });
        }
        self
    }

    /// Answer the given responses in order for prompts containing `needle`;
    /// the final response repeats once the sequence is exhausted.
    pub fn respond_seq(self, needle: &str, responses: &[&str]) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            rules.push(Rule {
                needle: needle.to_string(),
                responses: responses.iter().map(|s| s.to_string()).collect(),
                last: None,
            });
        }
        self
    }

    /// Number of completions served so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> GatewayResult<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = {
            let mut rules = self.rules.lock().unwrap();
            let rule = rules
                .iter_mut()
                .find(|r| request.prompt.contains(&r.needle))
                .ok_or_else(|| {
                    GatewayError::MalformedOutput(format!(
                        "no scripted response matches prompt: {}...",
                        request.prompt.chars().take(80).collect::<String>()
                    ))
                })?;
            match rule.responses.pop_front() {
                Some(next) => {
                    if rule.responses.is_empty() && rule.last.is_none() {
                        rule.last = Some(next.clone());
                    }
                    next
                }
                None => rule
                    .last
                    .clone()
                    .ok_or_else(|| GatewayError::MalformedOutput("scripted sequence exhausted".to_string()))?,
            }
        };

        let completion = Completion {
            tokens_in: (request.prompt.len() / 4) as u64,
            tokens_out: (text.len() / 4) as u64,
            cost_usd: 0.0,
            latency: Duration::from_millis(1),
            text,
        };
        self.metrics.record(&completion);
        Ok(completion)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// A search double returning fixed hits for every query.
pub struct ScriptedSearch {
    hits: Vec<SearchHit>,
}

impl ScriptedSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    /// A plausible default result set.
    pub fn canned() -> Self {
        Self::new(vec![
            SearchHit {
                title: "Option comparison".to_string(),
                url: "https://example.com/comparison".to_string(),
                snippet: "An in-depth comparison of popular options.".to_string(),
                authority_score: 0.9,
            },
            SearchHit {
                title: "Official documentation".to_string(),
                url: "https://example.com/docs".to_string(),
                snippet: "Getting started guide.".to_string(),
                authority_score: 0.8,
            },
        ])
    }
}

#[async_trait]
impl SearchGateway for ScriptedSearch {
    async fn search(&self, _query: SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        Ok(self.hits.clone())
    }
}

/// A search double that always fails, for outage-path tests.
pub struct FailingSearch;

#[async_trait]
impl SearchGateway for FailingSearch {
    async fn search(&self, query: SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        Err(GatewayError::SearchFailed(format!(
            "scripted outage for query: {}",
            query.query
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            model: "scripted".to_string(),
            temperature: 0.0,
            max_tokens: 16,
        }
    }

    #[tokio::test]
    async fn test_rule_matching_and_sequence() {
        let llm = ScriptedLlm::new()
            .respond("completeness", r#"{"score": 88}"#)
            .respond_seq("generate the TRD", &["draft one", "draft two"]);

        let c = llm.complete(request("assess completeness of PRD")).await.unwrap();
        assert_eq!(c.text, r#"{"score": 88}"#);

        let first = llm.complete(request("generate the TRD now")).await.unwrap();
        let second = llm.complete(request("generate the TRD now")).await.unwrap();
        let third = llm.complete(request("generate the TRD now")).await.unwrap();
        assert_eq!(first.text, "draft one");
        assert_eq!(second.text, "draft two");
        assert_eq!(third.text, "draft two");
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn test_unmatched_prompt_errors() {
        let llm = ScriptedLlm::new();
        let err = llm.complete(request("anything")).await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedOutput(_)));
    }
}
