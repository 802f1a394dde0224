//! File-level configuration model.
//!
//! Loaded by `infrastructure::config::ConfigLoader` through figment; the
//! runtime objects (`ControllerConfig`, the HTTP client config) are built
//! from these sections rather than from process-wide implicit state.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a Conclave deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerSection,

    #[serde(default)]
    pub model: ModelSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Decision-engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSection {
    /// Minimum score a specialist must reach to be dispatched.
    pub response_threshold: f64,

    /// Maximum number of execution units per plan. `None` means one per
    /// known chain.
    pub top_k: Option<usize>,

    /// Advisory: dispatch the resulting plan in parallel.
    pub parallelism: bool,

    /// Scoring attempts before giving up on malformed model output.
    pub max_retries: u32,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            response_threshold: 0.0,
            top_k: None,
            parallelism: false,
            max_retries: 3,
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    /// Model identifier, e.g. `"gpt-4o-mini"`.
    pub model: String,

    /// Base URL of the chat-completions endpoint.
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Sustained request rate allowed against the backend.
    pub rate_limit_rps: f64,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            rate_limit_rps: 2.0,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,

    /// One of: json, pretty.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.controller.max_retries, 3);
        assert_eq!(config.controller.response_threshold, 0.0);
        assert!(config.controller.top_k.is_none());
        assert!(!config.controller.parallelism);
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sections_are_optional_in_source() {
        let config: Config = serde_json::from_str(r#"{"logging": {"level": "debug", "format": "json"}}"#).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.controller.max_retries, 3);
    }
}
