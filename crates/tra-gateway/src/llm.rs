//! LLM gateway: one uniform `complete` operation with metrics and typed
//! errors. Prompts are composed by callers; the gateway is text-agnostic.

use crate::error::{GatewayError, GatewayResult};
use crate::retry::with_backoff;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tiktoken_rs::CoreBPE;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const API_KEY_ENV: &str = "TRA_LLM_API_KEY";

/// (model prefix, USD per million input tokens, USD per million output tokens)
static MODEL_COSTS: &[(&str, f64, f64)] = &[
    ("claude-opus", 15.0, 75.0),
    ("claude-sonnet", 3.0, 15.0),
    ("claude-haiku", 0.8, 4.0),
];

fn bpe() -> Option<&'static CoreBPE> {
    static BPE: OnceLock<Option<CoreBPE>> = OnceLock::new();
    BPE.get_or_init(|| tiktoken_rs::cl100k_base().ok()).as_ref()
}

/// Rough token count for budget checks before spending a call. Falls back
/// to a bytes/4 heuristic if the embedded BPE tables fail to load.
pub fn estimate_tokens(text: &str) -> usize {
    match bpe() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.len() / 4,
    }
}

fn cost_usd(model: &str, tokens_in: u64, tokens_out: u64) -> f64 {
    let (input_rate, output_rate) = MODEL_COSTS
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, i, o)| (*i, *o))
        .unwrap_or((3.0, 15.0));
    (tokens_in as f64 * input_rate + tokens_out as f64 * output_rate) / 1_000_000.0
}

/// One completion request.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One completion result with its cost accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub latency: Duration,
}

/// Per-gateway call counters.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    calls: AtomicU64,
    tokens_in: AtomicU64,
    tokens_out: AtomicU64,
    cost_microdollars: AtomicU64,
}

/// Readable snapshot of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
}

impl GatewayMetrics {
    pub fn record(&self, completion: &Completion) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.tokens_in.fetch_add(completion.tokens_in, Ordering::Relaxed);
        self.tokens_out.fetch_add(completion.tokens_out, Ordering::Relaxed);
        self.cost_microdollars
            .fetch_add((completion.cost_usd * 1_000_000.0) as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            tokens_in: self.tokens_in.load(Ordering::Relaxed),
            tokens_out: self.tokens_out.load(Ordering::Relaxed),
            cost_usd: self.cost_microdollars.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}

/// Uniform LLM call interface; the workflow only sees this trait.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> GatewayResult<Completion>;

    /// Snapshot of cumulative call metrics.
    fn metrics(&self) -> MetricsSnapshot;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Production gateway speaking the Anthropic messages API.
pub struct AnthropicGateway {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    /// Prompts estimated above this many tokens fail fast with
    /// `budget_exceeded` instead of burning a call.
    prompt_budget_tokens: usize,
    metrics: Arc<GatewayMetrics>,
}

impl std::fmt::Debug for AnthropicGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicGateway")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("prompt_budget_tokens", &self.prompt_budget_tokens)
            .finish()
    }
}

impl AnthropicGateway {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            prompt_budget_tokens: 150_000,
            metrics: Arc::new(GatewayMetrics::default()),
        }
    }

    /// Read the API key from `TRA_LLM_API_KEY`.
    pub fn from_env(timeout: Duration) -> GatewayResult<Self> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| GatewayError::MissingApiKey(API_KEY_ENV))?;
        Ok(Self::new(api_key, timeout))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_prompt_budget(mut self, tokens: usize) -> Self {
        self.prompt_budget_tokens = tokens;
        self
    }

    async fn call_once(&self, request: &CompletionRequest) -> GatewayResult<Completion> {
        let started = Instant::now();
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Http(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(GatewayError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedOutput(e.to_string()))?;
        let text: String = parsed.content.into_iter().map(|b| b.text).collect();
        if text.is_empty() {
            return Err(GatewayError::MalformedOutput(
                "empty completion content".to_string(),
            ));
        }

        Ok(Completion {
            cost_usd: cost_usd(&request.model, parsed.usage.input_tokens, parsed.usage.output_tokens),
            tokens_in: parsed.usage.input_tokens,
            tokens_out: parsed.usage.output_tokens,
            text,
            latency: started.elapsed(),
        })
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    async fn complete(&self, request: CompletionRequest) -> GatewayResult<Completion> {
        let estimated = estimate_tokens(&request.prompt);
        if estimated > self.prompt_budget_tokens {
            return Err(GatewayError::BudgetExceeded {
                estimated_tokens: estimated,
                budget_tokens: self.prompt_budget_tokens,
            });
        }

        let completion = with_backoff("llm.complete", 3, Duration::from_millis(500), || {
            self.call_once(&request)
        })
        .await?;

        self.metrics.record(&completion);
        debug!(
            model = %request.model,
            tokens_in = completion.tokens_in,
            tokens_out = completion.tokens_out,
            latency_ms = completion.latency.as_millis() as u64,
            "llm call completed"
        );
        Ok(completion)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
