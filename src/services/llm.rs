use crate::config::LlmConfig;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to text generation service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("text generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response from text generation service: {0}")]
    Decode(String),
}

/// Prompt in, text out. Any call may fail.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct LLMClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl LLMClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(LLMClient {
            client: reqwest::Client::builder().build()?,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut request_builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": self.temperature
                }
            }));

        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder.send().await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        tracing::debug!(chars = parsed.response.len(), "generation call completed");
        Ok(parsed.response)
    }
}
