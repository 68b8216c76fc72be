//! Document-generation errors.

use thiserror::Error;

/// Errors raised by generators and the validator.
#[derive(Error, Debug)]
pub enum DocgenError {
    #[error(transparent)]
    Gateway(#[from] tra_gateway::GatewayError),

    #[error("Generator output failed its contract: {0}")]
    BadOutput(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

/// Result type for document generation.
pub type DocgenResult<T> = Result<T, DocgenError>;

impl DocgenError {
    /// Whether a regenerate attempt may help.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_retriable(),
            Self::BadOutput(_) => true,
            Self::Template(_) => false,
        }
    }
}
