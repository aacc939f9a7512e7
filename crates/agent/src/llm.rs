use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use asesor_core::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm stream error: {0}")]
    Stream(String),
    #[error("llm generation timed out after {0}s")]
    Timeout(u64),
}

/// One decoded line of the model's streaming output. Lines without
/// usable text still advance the stream.
#[derive(Debug, Default, PartialEq)]
pub struct GenerateFragment {
    pub text: Option<String>,
    pub done: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Streaming client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.base_url.clone(), config.model.clone(), config.timeout_secs)
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    async fn stream_generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest { model: &self.model, prompt, stream: true };
        let mut response =
            self.http.post(self.endpoint()).json(&request).send().await?.error_for_status()?;

        let mut reply = String::new();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = response.chunk().await? {
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                let fragment = fragment_from_line(&line[..line.len() - 1])?;
                if let Some(text) = fragment.text {
                    reply.push_str(&text);
                }
                if fragment.done {
                    return Ok(reply);
                }
            }
        }

        if !buffer.is_empty() {
            let fragment = fragment_from_line(&buffer)?;
            if let Some(text) = fragment.text {
                reply.push_str(&text);
            }
        }

        Ok(reply)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        tokio::time::timeout(Duration::from_secs(self.timeout_secs), self.stream_generate(prompt))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout_secs))?
    }
}

/// Decode one newline-delimited JSON line from the generate stream.
/// Undecodable lines are skipped; an `error` payload fails the reply.
fn fragment_from_line(line: &[u8]) -> Result<GenerateFragment, LlmError> {
    let Ok(text) = std::str::from_utf8(line) else {
        return Ok(GenerateFragment::default());
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(GenerateFragment::default());
    }

    let Ok(chunk) = serde_json::from_str::<GenerateChunk>(trimmed) else {
        debug!(line = trimmed, "skipping undecodable generate chunk");
        return Ok(GenerateFragment::default());
    };

    if let Some(error) = chunk.error {
        return Err(LlmError::Stream(error));
    }

    Ok(GenerateFragment { text: chunk.response, done: chunk.done.unwrap_or(false) })
}
