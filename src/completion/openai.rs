use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::CompletionService;
use crate::config::CompletionConfig;
use crate::{RepurposeError, StageResult};

const SYSTEM_PROMPT: &str =
    "You are a professional content writer who repurposes video transcripts into \
     written posts. Follow the requested format exactly and never invent facts.";

/// Chat-completions client for OpenAI-compatible endpoints
pub struct OpenAiCompletion {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompletion {
    /// Build a client, reading the API key from the environment variable named
    /// in the configuration.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).with_context(|| {
            format!(
                "Environment variable {} must hold the completion API key",
                config.api_key_env
            )
        })?;
        Self::new(config, &api_key)
    }

    pub fn new(config: &CompletionConfig, api_key: &str) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing completion API key");
        anyhow::ensure!(!config.model.trim().is_empty(), "missing completion model name");

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid completion API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build completion HTTP client")?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.endpoint),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> StageResult<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                RepurposeError::TransientService(format!("completion request failed: {}", err))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(classify_status(status, &text));
        }

        let parsed: ChatResponse = response.json().await.map_err(|err| {
            RepurposeError::TransientService(format!("malformed completion response: {}", err))
        })?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                RepurposeError::TransientService("completion response had no content".to_string())
            })
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Rate limits and server errors are worth retrying; any other rejection is not.
fn classify_status(status: StatusCode, body: &str) -> RepurposeError {
    let message = format!("completion service returned {}: {}", status, body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RepurposeError::TransientService(message)
    } else {
        RepurposeError::Validation(message)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
