use serde::{Deserialize, Serialize};

use crate::summarize::{CompletionResult, SummaryError};

#[derive(Debug, Deserialize)]
pub struct ProcessForm {
    #[serde(rename = "fileUrl")]
    pub file_url: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenderForm {
    #[serde(default)]
    pub markdown: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportForm {
    #[serde(default)]
    pub html: String,
    pub rtl: Option<String>,
}

impl ExportForm {
    pub fn is_right_to_left(&self) -> bool {
        matches!(self.rtl.as_deref(), Some("1" | "true" | "rtl"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub file: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProcessResponse {
    pub fn invalid_request() -> Self {
        Self::failure("Invalid request.", None)
    }

    fn failure(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(error.into()),
            message,
        }
    }
}

impl From<&SummaryError> for ProcessResponse {
    fn from(e: &SummaryError) -> Self {
        match e {
            SummaryError::InvalidInput(_) | SummaryError::Fetch(_) => Self::failure(e.to_string(), None),
            SummaryError::Completion(inner) => {
                Self::failure("Failed to get summary.", Some(inner.to_string()))
            }
        }
    }
}

impl From<CompletionResult> for ProcessResponse {
    fn from(result: CompletionResult) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                summary: Some(summary),
                error: None,
                message: None,
            },
            Err(e) => Self::from(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::fetch::FetchError;
    use serde_json::json;

    fn wire(result: CompletionResult) -> serde_json::Value {
        serde_json::to_value(ProcessResponse::from(result)).unwrap()
    }

    #[test]
    fn success_shape() {
        assert_eq!(
            wire(Ok("# Done".to_string())),
            json!({"success": true, "summary": "# Done"})
        );
    }

    #[test]
    fn invalid_url_shape() {
        let err = SummaryError::InvalidInput("nope".to_string());
        assert_eq!(wire(Err(err)), json!({"success": false, "error": "Invalid URL"}));
    }

    #[test]
    fn fetch_failure_shape() {
        let err = SummaryError::Fetch(FetchError::Status(404));
        assert_eq!(
            wire(Err(err)),
            json!({
                "success": false,
                "error": "Failed to download file: The requested URL returned error: 404"
            })
        );
    }

    #[test]
    fn completion_failure_shape() {
        let err = SummaryError::Completion(CompletionError::MissingContent);
        assert_eq!(
            wire(Err(err)),
            json!({
                "success": false,
                "error": "Failed to get summary.",
                "message": "Unexpected API response structure"
            })
        );
    }

    #[test]
    fn invalid_request_shape() {
        assert_eq!(
            serde_json::to_value(ProcessResponse::invalid_request()).unwrap(),
            json!({"success": false, "error": "Invalid request."})
        );
    }

    #[test]
    fn export_direction_flag() {
        let form = |rtl: Option<&str>| ExportForm {
            html: String::new(),
            rtl: rtl.map(str::to_string),
        };
        assert!(form(Some("1")).is_right_to_left());
        assert!(form(Some("rtl")).is_right_to_left());
        assert!(!form(Some("0")).is_right_to_left());
        assert!(!form(None).is_right_to_left());
    }
}
