//! Chat-completions client for OpenAI-compatible APIs.
//!
//! Gemini, OpenAI, Groq, Ollama and friends all accept the same
//! `POST {base_url}/chat/completions` shape; only the base URL and key differ.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use ragdb_core::config::GenerationConfig;
use ragdb_core::traits::LanguageModel;
use ragdb_core::{Error, Result};

const CHAT_PATH: &str = "/chat/completions";

pub struct OpenAiCompatibleClient {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Build from settings. The API key comes from `api_key`, falling back
    /// to the env var named by `api_key_env`; neither being set is an error.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::InvalidConfig(format!(
                "no API key for {}: set generation.api_key or {}",
                config.model, config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(Error::InvalidConfig("generation.model must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Generation(format!("failed to build HTTP client: {e}")))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!(model = %config.model, %base_url, "language model client ready");
        Ok(Self { model: config.model.clone(), api_key: api_key.into(), base_url, temperature: config.temperature, client })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn extract_content(body: &Value) -> Result<String> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| Error::Generation("no choices in response".to_string()))?;
    choice["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| Error::Generation("response choice has no text content".to_string()))
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("API error {status}: {text}")));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("malformed response: {e}")))?;
        let content = extract_content(&body)?;
        debug!(elapsed = ?start.elapsed(), chars = content.len(), "generation complete");
        Ok(content)
    }
}
