//! Answer generation through an OpenAI-compatible chat-completions endpoint
//! (OpenAI, Ollama, vLLM, llama.cpp server and similar).

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use manualqa_core::config::LlmConfig;
use manualqa_core::traits::AnswerGenerator;

pub struct ChatCompletionGenerator {
    config: LlmConfig,
    client: reqwest::Client,
}

impl ChatCompletionGenerator {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        info!(base_url = %config.base_url, model = %config.model, "answer generator ready");
        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub fn request_body(&self, system_instruction: &str, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": false,
            "messages": [
                { "role": "system", "content": system_instruction },
                { "role": "user", "content": prompt },
            ],
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl AnswerGenerator for ChatCompletionGenerator {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String> {
        let mut request = self.client.post(self.endpoint()).json(&self.request_body(system_instruction, prompt));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.context("chat completion request failed")?;
        let status = response.status();
        let body = response.text().await.context("failed to read chat completion response")?;
        if !status.is_success() {
            bail!("chat completion returned HTTP {}: {}", status.as_u16(), body);
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| anyhow!("failed to parse chat completion response: {}", e))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| anyhow!("chat completion response contained no message"))?;
        debug!(chars = answer.chars().count(), "generated answer");
        Ok(answer)
    }
}
