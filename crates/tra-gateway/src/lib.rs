//! TRA Gateway Layer
//!
//! Uniform wrappers over the LLM provider and the web-search provider.
//! Both gateways expose trait seams so the workflow can run against
//! scripted doubles in tests; prompts and queries are composed by callers.

pub mod error;
pub mod llm;
pub mod retry;
pub mod search;
pub mod testing;

pub use error::{GatewayError, GatewayResult};
pub use llm::{
    AnthropicGateway, Completion, CompletionRequest, GatewayMetrics, LlmGateway, MetricsSnapshot,
};
pub use search::{SearchGateway, SearchHit, SearchQuery, TavilySearch};
