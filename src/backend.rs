//! Chat-completion backend.
//!
//! [`ChatBackend`] is the seam between the assistant and the language model.
//! [`OpenAiCompatibleBackend`] speaks the OpenAI `POST {endpoint}/chat/completions`
//! protocol (non-streaming), which Groq and most hosted providers accept.
//!
//! Calls are made once: there is no retry, and the only deadline is the
//! HTTP client timeout from `[backend].timeout_secs`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use juris_context_core::Message;

use crate::config::BackendConfig;

/// Maximum characters of an error body kept in logs and errors.
const SNIPPET_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API key not set: export {0} or add it to .env")]
    MissingApiKey(String),
    #[error("invalid backend configuration: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {snippet}")]
    Status {
        status: reqwest::StatusCode,
        snippet: String,
    },
    #[error("failed to decode backend response: {0}")]
    Decode(String),
    #[error("backend returned no choices")]
    EmptyChoices,
}

/// Produces the assistant's reply for a fully enriched transcript.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Identifier for logs, e.g. the model name.
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[Message]) -> Result<String, BackendError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for any OpenAI-compatible chat-completions endpoint.
#[derive(Debug)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    config: BackendConfig,
    url: String,
}

impl OpenAiCompatibleBackend {
    /// Build the client, reading the API key from `config.api_key_env`.
    pub fn from_env(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BackendError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, &api_key)
    }

    pub fn new(config: &BackendConfig, api_key: &str) -> Result<Self, BackendError> {
        let endpoint = config.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(BackendError::Config(format!(
                "endpoint must use http or https: {}",
                config.endpoint
            )));
        }

        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| BackendError::Config(format!("invalid API key header: {e}")))?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        let url = format!("{}/chat/completions", endpoint.trim_end_matches('/'));

        info!(
            model = %config.model,
            endpoint = %config.endpoint,
            timeout_secs = config.timeout_secs,
            "chat backend initialized"
        );

        Ok(Self {
            client,
            config: config.clone(),
            url,
        })
    }
}

fn snippet(body: &str) -> String {
    let mut s: String = body.chars().take(SNIPPET_CHARS).collect();
    if body.chars().count() > SNIPPET_CHARS {
        s.push_str("...");
    }
    s
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, BackendError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            stream: false,
        };

        debug!(
            model = %self.config.model,
            turns = messages.len(),
            "POST {}", self.url
        );

        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = snippet(&text);
            error!(
                %status,
                url = %self.url,
                %snippet,
                model = %self.config.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "chat completion returned non-success status"
            );
            return Err(BackendError::Status { status, snippet });
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            error!(
                error = %e,
                model = %self.config.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "failed to decode chat completion response"
            );
            BackendError::Decode(e.to_string())
        })?;

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(BackendError::EmptyChoices)?;

        info!(
            model = %self.config.model,
            latency_ms = started.elapsed().as_millis() as u64,
            reply_chars = content.chars().count(),
            "chat completion completed"
        );

        Ok(content)
    }
}
