// Copyright 2025 PeerJudge (https://github.com/peerjudge)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! LLM client abstraction for the Tier-2 judge.
//!
//! Providers are hidden behind the [`LLMClient`] trait; the judge only
//! depends on "send a prompt, get structured JSON back" plus cost
//! accounting. The factory functions at the bottom implement provider
//! selection: explicit by name, or "auto" picking the first provider whose
//! API key is present in the environment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable holding the Anthropic API key.
pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Trait for LLM clients used by judge assessments.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a prompt and get a structured JSON response.
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError>;

    /// Model name used for result metadata.
    fn model_name(&self) -> &str;

    /// Cost per token (input, output) in USD.
    fn cost_per_token(&self) -> (f64, f64);
}

/// Response from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Parse the response content as JSON.
    pub fn as_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Calculate cost based on per-token pricing.
    pub fn calculate_cost(&self, cost_per_input: f64, cost_per_output: f64) -> f64 {
        (self.prompt_tokens as f64 * cost_per_input)
            + (self.completion_tokens as f64 * cost_per_output)
    }
}

/// Errors from LLM clients.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LLMError {
    /// Authentication failures trigger the one-time provider switch.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, LLMError::Api { status: 401 | 403, .. })
    }
}

/// Errors from embedding clients.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("API error: {0}")]
    Api(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for embedding clients powering semantic similarity.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts, one vector per input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError>;
}

/// OpenAI chat-completions client.
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert evaluator of scientific peer reviews. Respond only with valid JSON."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": 0.0,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_data: serde_json::Value = response.json().await?;
        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "gpt-4o" => (0.0000025, 0.000010),
            "gpt-4o-mini" => (0.00000015, 0.0000006),
            "gpt-4-turbo" => (0.000010, 0.000030),
            _ => (0.00000015, 0.0000006),
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        // Chat model names fall back to the default embedding model.
        let embedding_model = if self.model.contains("embedding") {
            self.model.as_str()
        } else {
            "text-embedding-3-small"
        };

        let request = serde_json::json!({
            "model": embedding_model,
            "input": texts
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(EmbedError::RateLimitExceeded);
            }
            return Err(EmbedError::Api(message));
        }

        let response_data: serde_json::Value = response.json().await?;
        let mut embeddings = Vec::new();
        if let Some(data) = response_data["data"].as_array() {
            for item in data {
                if let Some(vector) = item["embedding"].as_array() {
                    embeddings.push(vector.iter().filter_map(|v| v.as_f64()).collect());
                }
            }
        }

        if embeddings.len() != texts.len() {
            return Err(EmbedError::Api(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

/// Anthropic messages client.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "system": "You are an expert evaluator of scientific peer reviews. Respond only with valid JSON.",
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_data: serde_json::Value = response.json().await?;
        let content = response_data["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let prompt_tokens = usage_data["input_tokens"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = usage_data["output_tokens"].as_u64().unwrap_or(0) as u32;
        let usage = TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "claude-3-5-haiku-20241022" => (0.0000008, 0.000004),
            _ => (0.000003, 0.000015),
        }
    }
}

/// Build a client for an explicitly named provider. Returns `None` when
/// the provider's API key is not present in the environment.
pub fn create_judge_client(provider: &str, model: &str) -> Option<Arc<dyn LLMClient>> {
    match provider {
        "openai" => std::env::var(OPENAI_API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .map(|key| Arc::new(OpenAIClient::new(key, model.to_string())) as Arc<dyn LLMClient>),
        "anthropic" => std::env::var(ANTHROPIC_API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .map(|key| {
                Arc::new(AnthropicClient::new(key, model.to_string())) as Arc<dyn LLMClient>
            }),
        other => {
            tracing::warn!(provider = other, "unknown LLM provider name");
            None
        }
    }
}

/// A client together with the provider name it was built for.
#[derive(Clone)]
pub struct NamedClient {
    pub provider: String,
    pub client: Arc<dyn LLMClient>,
}

impl NamedClient {
    pub fn new(provider: impl Into<String>, client: Arc<dyn LLMClient>) -> Self {
        Self {
            provider: provider.into(),
            client,
        }
    }

    /// "provider/model" label recorded on Tier-2 results.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.client.model_name())
    }
}

/// Resolve the primary and fallback clients from a provider setting.
///
/// "auto" selects the first of `[(provider, model), (fallback_provider,
/// fallback_model)]` whose key is available and leaves no fallback;
/// an explicit provider keeps the fallback for the one-time switch on
/// authentication failure.
pub fn resolve_judge_clients(
    provider: &str,
    model: &str,
    fallback_provider: &str,
    fallback_model: &str,
) -> (Option<NamedClient>, Option<NamedClient>) {
    if provider == "auto" {
        for (candidate, candidate_model) in [("openai", model), ("anthropic", fallback_model)] {
            if let Some(client) = create_judge_client(candidate, candidate_model) {
                debug!(provider = candidate, "auto-selected LLM provider");
                return (Some(NamedClient::new(candidate, client)), None);
            }
        }
        return (None, None);
    }

    let primary =
        create_judge_client(provider, model).map(|client| NamedClient::new(provider, client));
    let fallback = create_judge_client(fallback_provider, fallback_model)
        .map(|client| NamedClient::new(fallback_provider, client));
    (primary, fallback)
}
