//! Chat-Completion Client
//!
//! Text-in/text-out access to an OpenAI-compatible chat-completion endpoint.
//! The service talks to it through [`CompletionService`] so tests can swap in
//! a scripted double.

use async_trait::async_trait;
use brandlens_utils::{BrandlensError, BrandlensResult, LlmConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "Completion API";

/// A chat message sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one chat completion request and return the assistant's text.
    async fn complete(&self, messages: Vec<Message>) -> BrandlensResult<String>;
}

/// Client for `{api_url}/chat/completions`
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> BrandlensResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BrandlensError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_empty() {
            warn!("No completion API key configured; analysis requests will fail");
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, messages: Vec<Message>) -> BrandlensResult<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, messages = messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BrandlensError::external_service(SERVICE_NAME, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BrandlensError::external_service(SERVICE_NAME, e.to_string()))?;

        if !status.is_success() {
            return Err(BrandlensError::external_service(
                SERVICE_NAME,
                format!("status {}: {}", status.as_u16(), body),
            ));
        }

        parse_completion(&body)
    }
}

/// Pull `choices[0].message.content` out of a completion response body.
pub fn parse_completion(body: &str) -> BrandlensResult<String> {
    let response: CompletionResponse = serde_json::from_str(body)?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| BrandlensError::malformed_response("missing choices[0].message.content"))
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
