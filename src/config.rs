use std::net::SocketAddr;
use std::path::PathBuf;

use url::Url;

use crate::completion::{CompletionOptions, DEFAULT_MODEL};
use crate::fetch::FetchOptions;

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    MissingVar(&'static str),
    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub api_url: Url,
    pub api_key: String,
    pub completion: CompletionOptions,
    pub fetch: FetchOptions,
    pub pandoc_bin: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind = var("PODCAST_SUMMARY_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "PODCAST_SUMMARY_BIND",
                reason: e.to_string(),
            })?;

        let api_key =
            var("PODCAST_SUMMARY_API_KEY").ok_or(ConfigError::MissingVar("PODCAST_SUMMARY_API_KEY"))?;

        let api_url = var("PODCAST_SUMMARY_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url).map_err(|e| ConfigError::Invalid {
            name: "PODCAST_SUMMARY_API_URL",
            reason: e.to_string(),
        })?;

        let completion = CompletionOptions {
            model: var("PODCAST_SUMMARY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ..CompletionOptions::default()
        };

        let fetch = FetchOptions {
            insecure: var("PODCAST_SUMMARY_INSECURE_SSL").as_deref() == Some("1"),
            ..FetchOptions::default()
        };

        Ok(Self {
            bind,
            api_url,
            api_key,
            completion,
            fetch,
            pandoc_bin: var("PODCAST_SUMMARY_PANDOC_BIN").map(PathBuf::from),
        })
    }
}
