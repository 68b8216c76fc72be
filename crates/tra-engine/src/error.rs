//! Engine error types and node-error classification.

use thiserror::Error;
use tra_core::error::ErrorKind;

/// Errors surfaced by the engine's façade-facing operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] tra_core::error::CoreError),

    #[error("Store error: {0}")]
    Store(#[from] tra_db::StoreError),

    #[error("Checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {session_id} is not awaiting {expected}")]
    NotAwaiting {
        session_id: String,
        expected: &'static str,
    },

    #[error("Session {0} is in a terminal phase")]
    Terminal(String),

    #[error("Upstream design job {0} has not completed")]
    UpstreamIncomplete(String),

    #[error("Input missing: {0}")]
    InputMissing(String),

    #[error("Unknown technology category: {0}")]
    UnknownCategory(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A classified failure raised inside a node.
///
/// The kind drives retry, surfacing, and whether the session fails.
#[derive(Debug, Clone)]
pub struct NodeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl NodeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl From<tra_gateway::GatewayError> for NodeError {
    fn from(e: tra_gateway::GatewayError) -> Self {
        use tra_gateway::GatewayError as G;
        let kind = match &e {
            G::RateLimited { .. } => ErrorKind::LlmRateLimited,
            G::Timeout => ErrorKind::LlmTimeout,
            G::SearchFailed(_) => ErrorKind::SearchFailed,
            G::MalformedOutput(_) | G::BudgetExceeded { .. } | G::Api { .. } | G::Http(_) | G::MissingApiKey(_) => {
                ErrorKind::LlmMalformedOutput
            }
        };
        Self::new(kind, e.to_string())
    }
}

impl From<tra_docgen::DocgenError> for NodeError {
    fn from(e: tra_docgen::DocgenError) -> Self {
        match e {
            tra_docgen::DocgenError::Gateway(g) => g.into(),
            other => Self::new(ErrorKind::LlmMalformedOutput, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tra_gateway::GatewayError;

    #[test]
    fn test_gateway_error_classification() {
        let e: NodeError = GatewayError::Timeout.into();
        assert_eq!(e.kind, ErrorKind::LlmTimeout);
        let e: NodeError = GatewayError::SearchFailed("down".to_string()).into();
        assert_eq!(e.kind, ErrorKind::SearchFailed);
        let e: NodeError = GatewayError::MalformedOutput("bad".to_string()).into();
        assert_eq!(e.kind, ErrorKind::LlmMalformedOutput);
    }
}
