//! Port trait for language-model backends.
//!
//! The controller consumes models through this narrow interface: an ordered
//! list of role-tagged messages in, at least one candidate response text
//! plus a structured consumption record out. Vendor wire formats live
//! behind implementations in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::domain::models::Consumption;

/// Role tag of one prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        };
        write!(f, "{label}")
    }
}

/// One role-tagged prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: ModelRole,
    pub content: String,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::Assistant,
            content: content.into(),
        }
    }
}

/// Free-form provider options passed through to the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCallOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Additional provider-specific parameters.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Result of one model call.
///
/// Implementations guarantee at least one choice; `consumptions` carries
/// the named quantities (token counts and the like) the caller's budget
/// accounting must absorb.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    choices: Vec<String>,
    consumptions: Vec<Consumption>,
}

impl ModelResponse {
    pub fn new(choices: Vec<String>, consumptions: Vec<Consumption>) -> Self {
        Self {
            choices,
            consumptions,
        }
    }

    /// The first candidate response text, or an empty string if the
    /// implementation violated the at-least-one-choice contract.
    pub fn first_choice(&self) -> &str {
        self.choices.first().map_or("", String::as_str)
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn consumptions(&self) -> &[Consumption] {
        &self.consumptions
    }
}

/// Distinguishable failure kinds of a model call.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call failed: {0}")]
    CallFailed(String),

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("model rate limited: {0}")]
    RateLimited(String),
}

/// Port trait for model backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` for concurrent use across tokio
/// tasks.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier used as the prefix of consumption dimension labels,
    /// e.g. `"gpt-4o"`.
    fn model_name(&self) -> &str;

    /// Send the ordered message list and return the model's response.
    ///
    /// # Errors
    /// - [`ModelError::Timeout`] - the call exceeded the vendor timeout
    /// - [`ModelError::RateLimited`] - quota or rate limiting
    /// - [`ModelError::CallFailed`] - any other call failure
    async fn post_chat_request(
        &self,
        messages: &[ModelMessage],
        options: &ModelCallOptions,
    ) -> Result<ModelResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_falls_back_to_empty() {
        let empty = ModelResponse::new(Vec::new(), Vec::new());
        assert_eq!(empty.first_choice(), "");

        let filled = ModelResponse::new(vec!["a".into(), "b".into()], Vec::new());
        assert_eq!(filled.first_choice(), "a");
    }

    #[test]
    fn test_message_constructors_tag_roles() {
        assert_eq!(ModelMessage::system("s").role, ModelRole::System);
        assert_eq!(ModelMessage::user("u").role, ModelRole::User);
        assert_eq!(ModelMessage::assistant("a").role, ModelRole::Assistant);
        assert_eq!(ModelRole::Assistant.to_string(), "assistant");
    }
}
