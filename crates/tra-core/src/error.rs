//! Centralized error types and the workflow error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for core domain operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Unknown technology category: {0}")]
    UnknownCategory(String),

    #[error("No research result recorded for category '{0}'")]
    MissingResearch(String),

    #[error("No pending decision for category '{0}'")]
    NoPendingDecision(String),

    #[error("Invalid state transition: cannot move from '{from}' to '{to}'")]
    InvalidStateTransition { from: String, to: String },

    #[error("Session '{0}' is in a terminal phase and cannot be modified")]
    Terminal(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}

/// Classified failure kinds raised anywhere in the workflow.
///
/// Classification drives per-node retry, user surfacing, and whether a
/// failure terminates the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream design job has not reached `completed`.
    UpstreamIncomplete,
    /// Required PRD or design-document input is absent.
    InputMissing,
    /// LLM provider rejected the call with a rate limit.
    LlmRateLimited,
    /// LLM call exceeded its timeout.
    LlmTimeout,
    /// LLM returned output that failed the caller's contract.
    LlmMalformedOutput,
    /// Web search failed after retries.
    SearchFailed,
    /// Cache backend unreachable; downgraded to always-miss.
    CacheUnavailable,
    /// A file in the uploaded archive could not be parsed.
    ParseError,
    /// Checkpoint write failed.
    CheckpointFailure,
    /// Artifact persistence failed.
    PersistenceFailure,
    /// Operator cancelled the session.
    Cancelled,
    /// Session made no progress within the idle window.
    IdleTimeout,
}

impl ErrorKind {
    /// Whether the engine may retry the failing operation.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::LlmRateLimited
                | Self::LlmTimeout
                | Self::LlmMalformedOutput
                | Self::SearchFailed
                | Self::CheckpointFailure
                | Self::PersistenceFailure
        )
    }

    /// Whether a persistent failure of this kind terminates the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UpstreamIncomplete
                | Self::InputMissing
                | Self::CheckpointFailure
                | Self::PersistenceFailure
                | Self::IdleTimeout
        )
    }

    /// Whether the failure is surfaced to the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            Self::LlmRateLimited | Self::LlmTimeout | Self::CacheUnavailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpstreamIncomplete => "upstream_incomplete",
            Self::InputMissing => "input_missing",
            Self::LlmRateLimited => "llm_rate_limited",
            Self::LlmTimeout => "llm_timeout",
            Self::LlmMalformedOutput => "llm_malformed_output",
            Self::SearchFailed => "search_failed",
            Self::CacheUnavailable => "cache_unavailable",
            Self::ParseError => "parse_error",
            Self::CheckpointFailure => "checkpoint_failure",
            Self::PersistenceFailure => "persistence_failure",
            Self::Cancelled => "cancelled",
            Self::IdleTimeout => "idle_timeout",
        }
    }
}

/// A non-fatal failure appended to the session's error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub node: String,
    pub message: String,
    pub timestamp: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, node: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            node: node.to_string(),
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(ErrorKind::LlmRateLimited.is_retriable());
        assert!(ErrorKind::SearchFailed.is_retriable());
        assert!(!ErrorKind::UpstreamIncomplete.is_retriable());
        assert!(!ErrorKind::Cancelled.is_retriable());
        assert!(!ErrorKind::CacheUnavailable.is_retriable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ErrorKind::UpstreamIncomplete.is_fatal());
        assert!(ErrorKind::PersistenceFailure.is_fatal());
        assert!(!ErrorKind::LlmMalformedOutput.is_fatal());
        assert!(!ErrorKind::ParseError.is_fatal());
    }

    #[test]
    fn test_user_visibility() {
        assert!(ErrorKind::ParseError.is_user_visible());
        assert!(!ErrorKind::LlmRateLimited.is_user_visible());
        assert!(!ErrorKind::CacheUnavailable.is_user_visible());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::LlmMalformedOutput).unwrap();
        assert_eq!(json, "\"llm_malformed_output\"");
    }
}
