//! HTTP client for OpenAI-compatible chat-completions backends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::{Consumption, ModelSection};
use crate::domain::ports::{
    ModelCallOptions, ModelClient, ModelError, ModelMessage, ModelResponse,
};

use super::rate_limiter::TokenBucketRateLimiter;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatRequestMessage};

/// Configuration for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    /// API key for bearer authentication.
    pub api_key: String,
    /// Base URL, without the `/v1/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Sustained request rate.
    pub rate_limit_rps: f64,
    /// Default maximum tokens per response.
    pub max_tokens: u32,
    /// Default sampling temperature.
    pub temperature: f32,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            rate_limit_rps: 2.0,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

impl OpenAiClientConfig {
    /// Build from the `[model]` section of a loaded config file, reading
    /// the API key from the environment variable the section names.
    pub fn from_section(section: &ModelSection) -> Result<Self> {
        let api_key = std::env::var(&section.api_key_env).with_context(|| {
            format!("API key environment variable `{}` not set", section.api_key_env)
        })?;
        Ok(Self {
            api_key,
            base_url: section.base_url.clone(),
            model: section.model.clone(),
            timeout_secs: section.timeout_secs,
            rate_limit_rps: section.rate_limit_rps,
            max_tokens: section.max_tokens,
            temperature: section.temperature,
        })
    }
}

/// [`ModelClient`] implementation over the OpenAI chat-completions API.
///
/// Carries connection pooling (via `reqwest::Client`) and token-bucket
/// rate limiting. Transient-versus-permanent classification is the
/// caller's concern: this client only maps transport and status outcomes
/// onto the distinguishable [`ModelError`] kinds.
pub struct OpenAiClient {
    http_client: ReqwestClient,
    config: OpenAiClientConfig,
    rate_limiter: TokenBucketRateLimiter,
}

impl OpenAiClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let rate_limiter = TokenBucketRateLimiter::new(config.rate_limit_rps);
        Ok(Self {
            http_client,
            config,
            rate_limiter,
        })
    }

    fn build_request(
        &self,
        messages: &[ModelMessage],
        options: &ModelCallOptions,
    ) -> serde_json::Value {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|message| ChatRequestMessage {
                    role: message.role.to_string(),
                    content: message.content.clone(),
                })
                .collect(),
            temperature: options.temperature.or(Some(self.config.temperature)),
            max_tokens: options.max_tokens.or(Some(self.config.max_tokens)),
        };
        // Pass provider-specific extras through verbatim.
        let mut payload = serde_json::to_value(&request).unwrap_or_default();
        if let serde_json::Value::Object(map) = &mut payload {
            for (key, value) in &options.extra {
                map.insert(key.clone(), value.clone());
            }
        }
        payload
    }

    fn consumptions_from(&self, response: &ChatCompletionResponse) -> Vec<Consumption> {
        let Some(usage) = &response.usage else {
            return Vec::new();
        };
        let model = &self.config.model;
        vec![
            Consumption::new(
                f64::from(usage.prompt_tokens),
                "token",
                format!("{model}:prompt_tokens"),
            ),
            Consumption::new(
                f64::from(usage.completion_tokens),
                "token",
                format!("{model}:completion_tokens"),
            ),
            Consumption::new(
                f64::from(usage.total_tokens),
                "token",
                format!("{model}:total_tokens"),
            ),
        ]
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn post_chat_request(
        &self,
        messages: &[ModelMessage],
        options: &ModelCallOptions,
    ) -> Result<ModelResponse, ModelError> {
        self.rate_limiter.acquire().await;

        let payload = self.build_request(messages, options);
        debug!(model = %self.config.model, messages = messages.len(), "posting chat request");

        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    ModelError::Timeout(self.config.timeout_secs)
                } else {
                    ModelError::CallFailed(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited(body),
                StatusCode::REQUEST_TIMEOUT => ModelError::Timeout(self.config.timeout_secs),
                _ => ModelError::CallFailed(format!("HTTP {status}: {body}")),
            });
        }

        let decoded: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| ModelError::CallFailed(format!("invalid response body: {error}")))?;

        let choices: Vec<String> = decoded
            .choices
            .iter()
            .map(|choice| choice.message.content.clone().unwrap_or_default())
            .collect();
        if choices.is_empty() {
            return Err(ModelError::CallFailed(
                "response contained no choices".to_string(),
            ));
        }

        let consumptions = self.consumptions_from(&decoded);
        Ok(ModelResponse::new(choices, consumptions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ModelRole;

    #[test]
    fn test_build_request_maps_roles_and_extras() {
        let client = OpenAiClient::new(OpenAiClientConfig::default()).unwrap();
        let messages = vec![
            ModelMessage::system("be brief"),
            ModelMessage::user("hello"),
        ];
        let mut options = ModelCallOptions {
            max_tokens: Some(64),
            ..ModelCallOptions::default()
        };
        options
            .extra
            .insert("seed".to_string(), serde_json::json!(7));

        let payload = client.build_request(&messages, &options);
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["max_tokens"], 64);
        assert_eq!(payload["seed"], 7);
        assert_eq!(ModelRole::User.to_string(), "user");
    }

    #[test]
    fn test_usage_becomes_dimensioned_consumptions() {
        let client = OpenAiClient::new(OpenAiClientConfig::default()).unwrap();
        let decoded: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "ok"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}}"#,
        )
        .unwrap();
        let consumptions = client.consumptions_from(&decoded);
        assert_eq!(consumptions.len(), 3);
        assert_eq!(consumptions[0].quantity(), 10.0);
        assert_eq!(consumptions[0].unit(), "token");
        assert_eq!(consumptions[0].kind(), "gpt-4o-mini:prompt_tokens");
        assert_eq!(consumptions[2].kind(), "gpt-4o-mini:total_tokens");
    }
}
