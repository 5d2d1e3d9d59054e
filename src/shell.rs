//! Presentation shell.
//!
//! `GET /` only renders the page. When a transcript URL is given the page
//! comes back with the spinner showing and `app.js` drives the pipeline:
//! `POST /process`, then `POST /render`, then display. Direction toggling,
//! reset, clipboard and downloads also live in the script.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::summarize::TranscriptRequest;

const PAGE_TEMPLATE: &str = include_str!("../assets/index.html");
pub const APP_JS: &str = include_str!("../assets/app.js");

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").unwrap());

/// What the page shows when first served.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub request: Option<TranscriptRequest>,
}

impl ViewState {
    /// A page that starts summarizing `request` as soon as it loads.
    pub fn pending(request: TranscriptRequest) -> Self {
        Self {
            request: Some(request),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.request.is_some()
    }

    /// Placeholders are substituted in one scan of the template, so reflected
    /// values are never expanded again.
    pub fn render_page(&self) -> String {
        let (file_url, prompt) = match &self.request {
            Some(r) => (
                escape_html(&r.source_url),
                escape_html(r.custom_instruction.as_deref().unwrap_or("")),
            ),
            None => (String::new(), String::new()),
        };
        let (spinner_hidden, autostart) = if self.is_loading() {
            ("", "1")
        } else {
            ("hidden", "0")
        };

        PLACEHOLDER_RE
            .replace_all(PAGE_TEMPLATE, |caps: &Captures| match &caps[1] {
                "FILE_URL" => file_url.clone(),
                "PROMPT" => prompt.clone(),
                "SPINNER_HIDDEN" => spinner_hidden.to_string(),
                "AUTOSTART" => autostart.to_string(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TranscriptRequest {
        TranscriptRequest::new("https://example.org/episode.txt", Some("short".to_string()))
    }

    #[test]
    fn empty_page_is_idle() {
        let page = ViewState::default().render_page();
        assert!(page.contains("id=\"loadingSpinner\" hidden"));
        assert!(page.contains("data-autostart=\"0\""));
        assert!(page.contains("id=\"fileInput\" name=\"file\" value=\"\""));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn pending_page_shows_spinner_and_autostarts() {
        let page = ViewState::pending(request()).render_page();
        assert!(page.contains("id=\"loadingSpinner\" >"));
        assert!(page.contains("data-autostart=\"1\""));
        assert!(page.contains("value=\"https://example.org/episode.txt\""));
        assert!(page.contains("value=\"short\""));
        assert!(page.contains("id=\"resultContainer\" hidden"));
    }

    #[test]
    fn page_escapes_reflected_input() {
        let view = ViewState::pending(TranscriptRequest::new(
            "https://example.org/?a=\"><script>",
            Some("<b>".to_string()),
        ));
        let page = view.render_page();
        assert!(page.contains("https://example.org/?a=&quot;&gt;&lt;script&gt;"));
        assert!(page.contains("&lt;b&gt;"));
    }

    #[test]
    fn placeholders_in_reflected_input_stay_literal() {
        let view = ViewState::pending(TranscriptRequest::new(
            "https://example.org/{{AUTOSTART}}",
            Some("{{FILE_URL}}".to_string()),
        ));
        let page = view.render_page();
        assert!(page.contains("value=\"https://example.org/{{AUTOSTART}}\""));
        assert!(page.contains("value=\"{{FILE_URL}}\""));
    }
}
