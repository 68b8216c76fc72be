//! Runtime configuration.
//!
//! Loaded once at startup from a TOML file plus environment variables for
//! secrets, then treated as immutable. Unknown options are rejected.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub workflow: WorkflowConfig,
    pub research: ResearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LlmConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            temperature: 0.2,
            max_tokens: 8192,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchConfig {
    /// "basic" or "advanced".
    pub depth: String,
    pub max_results: u32,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: "basic".to_string(),
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// TTL for technology research entries, in seconds.
    pub research_ttl_secs: u64,
    /// TTL for code analysis entries, in seconds.
    pub code_ttl_secs: u64,
    /// TTL for API inference entries, in seconds.
    pub api_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            research_ttl_secs: 24 * 60 * 60,
            code_ttl_secs: 60 * 60,
            api_ttl_secs: 2 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WorkflowConfig {
    pub max_trd_iterations: u32,
    pub trd_pass_threshold: u8,
    pub completeness_threshold: u8,
    pub max_clarification_rounds: u32,
    pub max_conflict_rounds: u32,
    pub idle_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_trd_iterations: 3,
            trd_pass_threshold: 90,
            completeness_threshold: 80,
            max_clarification_rounds: 2,
            max_conflict_rounds: 3,
            idle_timeout_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ResearchConfig {
    /// Maximum concurrent per-gap research tasks.
    pub parallelism: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self { parallelism: 3 }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.trd_pass_threshold > 100 {
            return Err(ConfigError::InvalidValue(
                "workflow.trd_pass_threshold must be <= 100".to_string(),
            ));
        }
        if self.workflow.completeness_threshold > 100 {
            return Err(ConfigError::InvalidValue(
                "workflow.completeness_threshold must be <= 100".to_string(),
            ));
        }
        if self.workflow.max_trd_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "workflow.max_trd_iterations must be >= 1".to_string(),
            ));
        }
        if self.research.parallelism == 0 {
            return Err(ConfigError::InvalidValue(
                "research.parallelism must be >= 1".to_string(),
            ));
        }
        if self.search.depth != "basic" && self.search.depth != "advanced" {
            return Err(ConfigError::InvalidValue(format!(
                "search.depth must be 'basic' or 'advanced', got '{}'",
                self.search.depth
            )));
        }
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue(
                "llm.temperature must be in [0.0, 1.0]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.workflow.idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workflow.max_trd_iterations, 3);
        assert_eq!(config.workflow.trd_pass_threshold, 90);
        assert_eq!(config.workflow.completeness_threshold, 80);
        assert_eq!(config.research.parallelism, 3);
        assert_eq!(config.cache.research_ttl_secs, 86400);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml_str(
            r#"
            [workflow]
            trd_pass_threshold = 85

            [search]
            depth = "advanced"
            "#,
        )
        .unwrap();
        assert_eq!(config.workflow.trd_pass_threshold, 85);
        assert_eq!(config.search.depth, "advanced");
        // Untouched sections keep defaults
        assert_eq!(config.llm.max_tokens, 8192);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result = Config::from_toml_str(
            r#"
            [workflow]
            retry_budget = 5
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_depth_rejected() {
        let result = Config::from_toml_str(
            r#"
            [search]
            depth = "exhaustive"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_threshold_bounds() {
        let result = Config::from_toml_str(
            r#"
            [workflow]
            trd_pass_threshold = 120
            "#,
        );
        assert!(result.is_err());
    }
}
