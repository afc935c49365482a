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

//! Deterministic LLM client for tests.
//!
//! Tier-2 assessments run concurrently, so canned responses can be keyed
//! by a prompt substring ([`MockLLMClient::with_response_for`]) instead of
//! relying on call order. LLM-judge tests assert structural properties
//! (ranges, fallback flags), never literal model scores.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::llm_client::{LLMClient, LLMError, LLMResponse, TokenUsage};

enum FailureMode {
    Generic,
    Auth,
}

/// Scripted LLM client.
pub struct MockLLMClient {
    model: String,
    keyed: Vec<(String, String)>,
    queue: Mutex<VecDeque<String>>,
    prompts: Arc<Mutex<Vec<String>>>,
    failure: Option<FailureMode>,
    delay: Option<Duration>,
}

impl MockLLMClient {
    pub fn new(_name: &str) -> Self {
        Self {
            model: "mock-model".to_string(),
            keyed: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            prompts: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            delay: None,
        }
    }

    /// Responses served in order to un-keyed prompts.
    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        *self.queue.lock() = responses.into_iter().map(String::from).collect();
        self
    }

    /// Response served whenever the prompt contains `substring`. Keyed
    /// responses take priority over the queue and survive concurrency.
    pub fn with_response_for(mut self, substring: &str, response: &str) -> Self {
        self.keyed.push((substring.to_string(), response.to_string()));
        self
    }

    /// Every call fails with a generic API error.
    pub fn always_failing(mut self) -> Self {
        self.failure = Some(FailureMode::Generic);
        self
    }

    /// Every call fails with an authentication error (status 401).
    pub fn with_auth_failure(mut self) -> Self {
        self.failure = Some(FailureMode::Auth);
        self
    }

    /// Sleep before answering; combine with tight timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared handle to the prompts received so far.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        self.prompts.lock().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failure {
            Some(FailureMode::Generic) => {
                return Err(LLMError::Api {
                    status: 500,
                    message: "mock failure".to_string(),
                })
            }
            Some(FailureMode::Auth) => {
                return Err(LLMError::Api {
                    status: 401,
                    message: "invalid api key".to_string(),
                })
            }
            None => {}
        }

        let content = self
            .keyed
            .iter()
            .find(|(substring, _)| prompt.contains(substring))
            .map(|(_, response)| response.clone())
            .or_else(|| self.queue.lock().pop_front())
            .ok_or_else(|| LLMError::InvalidResponse("no canned response".to_string()))?;

        Ok(LLMResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: (prompt.len() / 4) as u32,
                completion_tokens: 32,
                total_tokens: (prompt.len() / 4) as u32 + 32,
            },
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}
