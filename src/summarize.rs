use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use url::Url;

use crate::completion::{CompletionClient, CompletionError, CompletionOptions, Prompt};
use crate::fetch::{FetchError, TextFetcher};

// ── Prompt template ──────────────────────────────────────────────────────────

pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant that summarizes content.";

const INSTRUCTIONS: &str = "Summarize the following podcast transcript in a detailed yet concise manner:

1. Create a clear heading based on the main subject/theme of the podcast
2. Do not change the language of the content after summarizing
3. Use headings, subheadings, and markdown for clear formatting
4. Ensure all key points, quotes, and important discussions remain intact
5. Preserve significant anecdotes, examples, and expert insights
6. Use bullet points where appropriate
7. Highlight key concepts and memorable quotes with bold text
8. Explain details comprehensively while avoiding repetition
9. Structure the summary for easy reading with clear topic transitions
10. Include any relevant statistics, data, or research mentioned
11. Note any significant guest speakers or expert contributors
12. If the content is in Persian, summarize it in Persian
13. If the content is in English, summarize it in English

The summary should capture the essence of the discussion while maintaining the natural flow of conversation and key takeaways.";

const CONTENT_SEPARATOR: &str = "\n\nContent:\n";

// ── Error types ──────────────────────────────────────────────────────────────

/// Flat failure tag shared by the orchestrator and the export adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    FetchError,
    TransportError,
    UpstreamStatusError,
    MalformedResponse,
    ExportUnavailable,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SummaryError {
    #[error("Invalid URL")]
    InvalidInput(String),
    #[error("Failed to download file: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl SummaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummaryError::InvalidInput(_) => ErrorKind::InvalidInput,
            SummaryError::Fetch(_) => ErrorKind::FetchError,
            SummaryError::Completion(CompletionError::Transport(_)) => ErrorKind::TransportError,
            SummaryError::Completion(CompletionError::UpstreamStatus(_)) => {
                ErrorKind::UpstreamStatusError
            }
            SummaryError::Completion(CompletionError::Decode(_))
            | SummaryError::Completion(CompletionError::MissingContent) => {
                ErrorKind::MalformedResponse
            }
        }
    }
}

/// Raw summary text on success.
pub type CompletionResult = Result<String, SummaryError>;

// ── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub source_url: String,
    pub custom_instruction: Option<String>,
}

impl TranscriptRequest {
    pub fn new(source_url: impl Into<String>, custom_instruction: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            custom_instruction,
        }
    }
}

pub fn validate_source_url(url: &str) -> Result<Url, SummaryError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| SummaryError::InvalidInput(format!("{}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SummaryError::InvalidInput(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(SummaryError::InvalidInput("missing host".to_string()));
    }
    Ok(parsed)
}

/// Instructions, then the optional custom instruction, then the transcript
/// verbatim after the content separator.
pub fn build_prompt(custom_instruction: Option<&str>, transcript: &str) -> Prompt {
    let mut user_message = INSTRUCTIONS.to_string();

    if let Some(extra) = custom_instruction.map(str::trim).filter(|s| !s.is_empty()) {
        user_message.push_str("\n\n");
        user_message.push_str(extra);
    }

    user_message.push_str(CONTENT_SEPARATOR);
    user_message.push_str(transcript);

    Prompt {
        system_message: SYSTEM_MESSAGE.to_string(),
        user_message,
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// Fetches a transcript and asks the completion endpoint to summarize it.
///
/// One attempt per call and no retries. Every failure comes back as a
/// [`SummaryError`] value.
pub struct Summarizer {
    fetcher: Arc<dyn TextFetcher>,
    completion: Arc<dyn CompletionClient>,
    options: CompletionOptions,
}

impl Summarizer {
    pub fn new(
        fetcher: Arc<dyn TextFetcher>,
        completion: Arc<dyn CompletionClient>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            fetcher,
            completion,
            options,
        }
    }

    pub async fn summarize(&self, request: &TranscriptRequest) -> CompletionResult {
        let url = validate_source_url(&request.source_url).map_err(|e| {
            tracing::warn!(url = %request.source_url, error = %e, "rejected source url");
            e
        })?;

        let bytes = self.fetcher.fetch_text(&url).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "transcript fetch failed");
            SummaryError::from(e)
        })?;
        let transcript = String::from_utf8_lossy(&bytes);
        tracing::info!(url = %url, bytes = bytes.len(), "transcript fetched");

        let prompt = build_prompt(request.custom_instruction.as_deref(), &transcript);

        let started = Instant::now();
        let text = self
            .completion
            .complete(&prompt, &self.options)
            .await
            .map_err(|e| {
                tracing::error!(model = %self.options.model, error = %e, "completion failed");
                SummaryError::from(e)
            })?;
        tracing::info!(
            model = %self.options.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "summary received"
        );

        Ok(text.trim().to_string())
    }
}
