//! Downloadable artifacts built from the rendered summary.
//!
//! Plain text and clipboard payloads are derived locally. Word documents go
//! through an external converter (pandoc) that is resolved lazily on first
//! use, so a missing binary only breaks the docx download.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use scraper::Html;
use serde::Serialize;
use tempfile::tempdir;
use tokio::process::Command;
use which::which;

use crate::summarize::ErrorKind;

// ── Constants ────────────────────────────────────────────────────────────────

pub const TXT_FILE_NAME: &str = "summary.txt";
pub const DOCX_FILE_NAME: &str = "document.docx";
pub const TXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const FONT_STACK: &str = "iransansx, iransans, iransansfanum, iranyekan, Arial, sans-serif";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("document converter unavailable: {0}")]
    Unavailable(String),
    #[error("document conversion failed: {0}")]
    Conversion(String),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExportUnavailable
    }
}

// ── Artifacts ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Artifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Rich and plain flavors of the same content, written together so pasting
/// keeps formatting where the target supports it.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: String,
    pub text: String,
}

/// Text content of an HTML fragment with every tag dropped.
pub fn plain_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

pub fn text_artifact(html: &str) -> Artifact {
    Artifact {
        file_name: TXT_FILE_NAME,
        content_type: TXT_CONTENT_TYPE,
        bytes: plain_text(html).into_bytes(),
    }
}

pub fn clipboard_payload(html: &str) -> ClipboardPayload {
    ClipboardPayload {
        html: html.to_string(),
        text: plain_text(html),
    }
}

/// Wrap a rendered fragment into a self-contained page for conversion.
pub fn standalone_document(html: &str, is_right_to_left: bool) -> String {
    let direction = if is_right_to_left { "rtl" } else { "ltr" };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>\nbody {{ direction: {direction}; font-family: {FONT_STACK}; }}\n</style>\n</head>\n<body dir=\"{direction}\">{html}</body>\n</html>\n"
    )
}

pub async fn docx_artifact(
    converter: &dyn DocumentConverter,
    html: &str,
    is_right_to_left: bool,
) -> Result<Artifact, ExportError> {
    converter.ensure_available().await?;
    let document = standalone_document(html, is_right_to_left);
    let bytes = converter.convert(&document).await?;
    tracing::info!(bytes = bytes.len(), "docx export generated");
    Ok(Artifact {
        file_name: DOCX_FILE_NAME,
        content_type: DOCX_CONTENT_TYPE,
        bytes,
    })
}

// ── Document conversion capability ───────────────────────────────────────────

/// HTML to word-processor conversion. Callers must pass `ensure_available`
/// before `convert`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn ensure_available(&self) -> Result<(), ExportError>;
    async fn convert(&self, standalone_html: &str) -> Result<Vec<u8>, ExportError>;
}

pub struct PandocConverter {
    configured: Option<PathBuf>,
    binary: OnceCell<PathBuf>,
}

impl PandocConverter {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self {
            configured,
            binary: OnceCell::new(),
        }
    }

    /// Only a successful lookup is cached; a failed one is retried next time.
    fn resolve(&self) -> Result<&Path, ExportError> {
        self.binary
            .get_or_try_init(|| resolve_pandoc_binary(self.configured.as_deref()))
            .map(PathBuf::as_path)
    }
}

#[async_trait]
impl DocumentConverter for PandocConverter {
    async fn ensure_available(&self) -> Result<(), ExportError> {
        let binary = self.resolve().map_err(|e| {
            tracing::warn!(error = %e, "docx export unavailable");
            e
        })?;
        tracing::debug!(binary = %binary.display(), "document converter resolved");
        Ok(())
    }

    async fn convert(&self, standalone_html: &str) -> Result<Vec<u8>, ExportError> {
        let binary = self.resolve()?.to_path_buf();
        let temp_dir =
            tempdir().map_err(|e| ExportError::Conversion(format!("Temp dir error: {e}")))?;
        let input = temp_dir.path().join("summary.html");
        let output = temp_dir.path().join("summary.docx");

        tokio::fs::write(&input, standalone_html)
            .await
            .map_err(|e| ExportError::Conversion(e.to_string()))?;

        let result = Command::new(&binary)
            .arg("--from=html")
            .arg("--to=docx")
            .arg("--output")
            .arg(&output)
            .arg(&input)
            .output()
            .await
            .map_err(|e| {
                ExportError::Conversion(format!(
                    "Failed to launch pandoc ({}): {}",
                    binary.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            return Err(ExportError::Conversion(format!(
                "pandoc exited with status {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        tokio::fs::read(&output)
            .await
            .map_err(|e| ExportError::Conversion(e.to_string()))
    }
}

fn resolve_pandoc_binary(configured: Option<&Path>) -> Result<PathBuf, ExportError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ExportError::Unavailable(format!(
            "configured pandoc binary {} does not exist",
            path.display()
        )));
    }

    which("pandoc").map_err(|e| ExportError::Unavailable(format!("pandoc not found on PATH: {e}")))
}
