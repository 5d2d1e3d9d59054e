use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const MAX_TOKENS: u32 = 4096;
pub const TEMPERATURE: f64 = 0.7;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("{0}")]
    Transport(String),
    #[error("HTTP Error: {0}")]
    UpstreamStatus(u16),
    #[error("JSON decode error: {0}")]
    Decode(String),
    #[error("Unexpected API response structure")]
    MissingContent,
}

// ── Capability ───────────────────────────────────────────────────────────────

/// The system/user message pair sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_message: String,
    pub user_message: String,
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &Prompt,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError>;
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(prompt: &'a Prompt, options: &'a CompletionOptions) -> Self {
        Self {
            model: &options.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_message,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

/// Pull `choices[0].message.content` out of a chat completion body.
pub fn parse_completion_body(body: &str) -> Result<String, CompletionError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CompletionError::Decode(e.to_string()))?;
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(CompletionError::MissingContent)
}

// ── HTTP implementation ──────────────────────────────────────────────────────

/// Chat-completions client speaking the OpenAI-compatible wire format.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl ChatCompletionClient {
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Result<Self, CompletionError> {
        let client = reqwest::ClientBuilder::new()
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(
        &self,
        prompt: &Prompt,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest::new(prompt, options);

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        tracing::debug!(status = status.as_u16(), body = %body, "completion response");

        if !status.is_success() {
            return Err(CompletionError::UpstreamStatus(status.as_u16()));
        }

        parse_completion_body(&body)
    }
}
