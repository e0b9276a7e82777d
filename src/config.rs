//! Process configuration, read once from the environment at startup.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub output_dir: PathBuf,
    pub max_retries: usize,
    pub pdf_engine_bin: String,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let llm = LlmConfig {
            // Ollama by default
            api_url: env_or("LLM_API_URL", "http://localhost:11434/api/generate"),
            api_key: std::env::var("LLM_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: env_or("LLM_MODEL", "llama2"),
            temperature: parse_env("LLM_TEMPERATURE", 0.7)?,
        };

        let max_retries: usize = parse_env("CHAPTER_MAX_RETRIES", 3)?;

        Ok(AppConfig {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "./output")),
            max_retries: max_retries.max(1),
            pdf_engine_bin: env_or("PDF_ENGINE_BIN", "wkhtmltopdf"),
            llm,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
