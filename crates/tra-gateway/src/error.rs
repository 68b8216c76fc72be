//! Typed gateway errors.

use thiserror::Error;

/// Errors raised by the LLM and search gateways.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Rate limited by provider{}", retry_after_secs.map(|s| format!(" (retry after {}s)", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Request timed out")]
    Timeout,

    #[error("Provider returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("Prompt of ~{estimated_tokens} tokens exceeds the {budget_tokens} token budget")]
    BudgetExceeded {
        estimated_tokens: usize,
        budget_tokens: usize,
    },

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Whether a caller may retry the operation.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::SearchFailed(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_kinds() {
        assert!(GatewayError::RateLimited { retry_after_secs: None }.is_retriable());
        assert!(GatewayError::Timeout.is_retriable());
        assert!(GatewayError::Api { status: 503, message: String::new() }.is_retriable());
        assert!(!GatewayError::Api { status: 400, message: String::new() }.is_retriable());
        assert!(!GatewayError::MalformedOutput("bad json".to_string()).is_retriable());
        assert!(!GatewayError::BudgetExceeded { estimated_tokens: 10, budget_tokens: 5 }.is_retriable());
    }
}
