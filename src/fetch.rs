use std::time::Duration;

use async_trait::async_trait;
use url::Url;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "podcast-summary/0.1";
pub const MAX_REDIRECTS: usize = 5;
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),
    #[error("Maximum ({0}) redirects followed")]
    TooManyRedirects(usize),
    #[error("Could not connect: {0}")]
    Connect(String),
    #[error("The requested URL returned error: {0}")]
    Status(u16),
    #[error("{0}")]
    Request(String),
}

// ── Capability ───────────────────────────────────────────────────────────────

/// Downloads the raw transcript behind a URL.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_redirects: usize,
    pub timeout: Duration,
    /// Skip certificate verification. Only meant for local testing.
    pub insecure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_redirects: MAX_REDIRECTS,
            timeout: FETCH_TIMEOUT,
            insecure: false,
        }
    }
}

// ── HTTP implementation ──────────────────────────────────────────────────────

pub struct HttpFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let mut builder = reqwest::ClientBuilder::new()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .user_agent(USER_AGENT);

        if options.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client, options })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.options.timeout.as_secs())
        } else if e.is_redirect() {
            FetchError::TooManyRedirects(self.options.max_redirects)
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::Redirect, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetches_body_bytes() {
        let base = serve(Router::new().route("/t.txt", get(|| async { "hello transcript" }))).await;
        let fetcher = HttpFetcher::new(FetchOptions::default()).unwrap();

        let url = Url::parse(&format!("{}/t.txt", base)).unwrap();
        let body = fetcher.fetch_text(&url).await.unwrap();
        assert_eq!(body, b"hello transcript");
    }

    #[tokio::test]
    async fn follows_redirects() {
        let app = Router::new()
            .route("/old", get(|| async { Redirect::temporary("/new") }))
            .route("/new", get(|| async { "moved" }));
        let base = serve(app).await;
        let fetcher = HttpFetcher::new(FetchOptions::default()).unwrap();

        let url = Url::parse(&format!("{}/old", base)).unwrap();
        assert_eq!(fetcher.fetch_text(&url).await.unwrap(), b"moved");
    }

    #[tokio::test]
    async fn redirect_loop_hits_limit() {
        let app = Router::new().route("/loop", get(|| async { Redirect::temporary("/loop") }));
        let base = serve(app).await;
        let fetcher = HttpFetcher::new(FetchOptions::default()).unwrap();

        let url = Url::parse(&format!("{}/loop", base)).unwrap();
        let err = fetcher.fetch_text(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects(MAX_REDIRECTS)), "{err:?}");
    }

    #[tokio::test]
    async fn error_status_is_a_fetch_error() {
        let app = Router::new().route("/gone", get(|| async { StatusCode::NOT_FOUND }));
        let base = serve(app).await;
        let fetcher = HttpFetcher::new(FetchOptions::default()).unwrap();

        let url = Url::parse(&format!("{}/gone", base)).unwrap();
        let err = fetcher.fetch_text(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)), "{err:?}");
    }
}
