use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;

mod completion;
mod config;
mod export;
mod fetch;
mod markdown;
mod models;
mod shell;
mod summarize;

use completion::ChatCompletionClient;
use config::Config;
use export::{Artifact, DocumentConverter, ExportError, PandocConverter};
use fetch::HttpFetcher;
use markdown::RenderedDocument;
use models::{ExportForm, PageQuery, ProcessForm, ProcessResponse, RenderForm};
use shell::ViewState;
use summarize::{Summarizer, TranscriptRequest};

#[derive(Clone)]
struct AppState {
    summarizer: Arc<Summarizer>,
    converter: Arc<dyn DocumentConverter>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;

    let fetcher = HttpFetcher::new(config.fetch.clone())?;
    let completion = ChatCompletionClient::new(config.api_url.clone(), config.api_key.clone())?;
    let state = AppState {
        summarizer: Arc::new(Summarizer::new(
            Arc::new(fetcher),
            Arc::new(completion),
            config.completion.clone(),
        )),
        converter: Arc::new(PandocConverter::new(config.pandoc_bin.clone())),
    };

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(model = %config.completion.model, "listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/app.js", get(app_js))
        .route("/health", get(health))
        .route("/process", post(process).fallback(invalid_request))
        .route("/render", post(render))
        .route("/export/txt", post(export_txt))
        .route("/export/docx", post(export_docx))
        .route("/export/clipboard", post(export_clipboard))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn index(Query(query): Query<PageQuery>) -> Html<String> {
    let view = match query.file.filter(|f| !f.trim().is_empty()) {
        Some(file) => ViewState::pending(TranscriptRequest::new(file, query.prompt)),
        None => ViewState::default(),
    };
    Html(view.render_page())
}

async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        shell::APP_JS,
    )
}

async fn process(
    State(state): State<AppState>,
    form: Result<Form<ProcessForm>, FormRejection>,
) -> Json<ProcessResponse> {
    let request = match form {
        Ok(Form(ProcessForm {
            file_url: Some(file_url),
            prompt,
        })) => TranscriptRequest::new(file_url, prompt),
        Ok(_) => return invalid_request().await,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable process form");
            return invalid_request().await;
        }
    };

    Json(state.summarizer.summarize(&request).await.into())
}

async fn invalid_request() -> Json<ProcessResponse> {
    Json(ProcessResponse::invalid_request())
}

async fn render(Form(form): Form<RenderForm>) -> Json<RenderedDocument> {
    Json(RenderedDocument::from_markdown(&form.markdown))
}

async fn export_txt(Form(form): Form<ExportForm>) -> Response {
    artifact_response(export::text_artifact(&form.html))
}

async fn export_clipboard(Form(form): Form<ExportForm>) -> Response {
    Json(export::clipboard_payload(&form.html)).into_response()
}

async fn export_docx(State(state): State<AppState>, Form(form): Form<ExportForm>) -> Response {
    match export::docx_artifact(state.converter.as_ref(), &form.html, form.is_right_to_left()).await
    {
        Ok(artifact) => artifact_response(artifact),
        Err(e) => {
            tracing::warn!(error = %e, "docx export failed");
            let status = match e {
                ExportError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ExportError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(json!({
                    "success": false,
                    "kind": e.kind(),
                    "error": "Unable to generate DOCX.",
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn artifact_response(artifact: Artifact) -> Response {
    (
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
        ],
        artifact.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::summarize::tests::{summarizer, FakeCompletion, FakeFetcher};
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    async fn serve(completion: Arc<FakeCompletion>) -> String {
        let state = AppState {
            summarizer: Arc::new(summarizer(FakeFetcher::ok("transcript"), completion)),
            converter: Arc::new(PandocConverter::new(Some(PathBuf::from("/nonexistent/pandoc")))),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn post_form(url: String, fields: &[(&str, &str)]) -> reqwest::Response {
        reqwest::Client::new().post(url).form(fields).send().await.unwrap()
    }

    #[tokio::test]
    async fn process_returns_summary() {
        let base = serve(FakeCompletion::replying(Ok(" # Episode \n".to_string()))).await;
        let body: Value = post_form(
            format!("{}/process", base),
            &[("fileUrl", "https://example.org/t.txt"), ("prompt", "short")],
        )
        .await
        .json()
        .await
        .unwrap();
        assert_eq!(body, json!({"success": true, "summary": "# Episode"}));
    }

    #[tokio::test]
    async fn process_rejects_missing_field_and_wrong_method() {
        let base = serve(FakeCompletion::replying(Ok("unused".to_string()))).await;
        let expected = json!({"success": false, "error": "Invalid request."});

        let body: Value = post_form(format!("{}/process", base), &[("prompt", "x")])
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body, expected);

        let body: Value = reqwest::get(format!("{}/process", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn process_reports_completion_failure() {
        let base = serve(FakeCompletion::replying(Err(CompletionError::UpstreamStatus(500)))).await;
        let body: Value = post_form(
            format!("{}/process", base),
            &[("fileUrl", "https://example.org/t.txt")],
        )
        .await
        .json()
        .await
        .unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": "Failed to get summary.", "message": "HTTP Error: 500"})
        );
    }

    #[tokio::test]
    async fn index_defers_summary_to_the_browser() {
        let completion = FakeCompletion::replying(Ok("## Notes".to_string()));
        let base = serve(completion.clone()).await;
        let page = reqwest::get(format!("{}/?file=https://example.org/t.txt&prompt=short", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
        assert!(page.contains("data-autostart=\"1\""));
        assert!(page.contains("id=\"loadingSpinner\" >"));
        assert!(page.contains("value=\"https://example.org/t.txt\""));
        assert!(page.contains("value=\"short\""));
        assert!(!page.contains("<h2>Notes</h2>"));
    }

    #[tokio::test]
    async fn index_without_file_is_idle() {
        let completion = FakeCompletion::replying(Ok("unused".to_string()));
        let base = serve(completion.clone()).await;
        let page = reqwest::get(format!("{}/?file=%20", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
        assert!(page.contains("data-autostart=\"0\""));
        assert!(page.contains("id=\"loadingSpinner\" hidden"));
    }

    #[tokio::test]
    async fn render_endpoint_converts_markdown() {
        let base = serve(FakeCompletion::replying(Ok("unused".to_string()))).await;
        let body: Value = post_form(format!("{}/render", base), &[("markdown", "**سلام**")])
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(
            body,
            json!({"html": "<strong>سلام</strong>", "isRightToLeft": true})
        );
    }

    #[tokio::test]
    async fn txt_export_is_an_attachment() {
        let base = serve(FakeCompletion::replying(Ok("unused".to_string()))).await;
        let response = post_form(format!("{}/export/txt", base), &[("html", "<h1>T</h1><p>body</p>")]).await;
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION.as_str()],
            "attachment; filename=\"summary.txt\""
        );
        assert_eq!(response.text().await.unwrap(), "Tbody");
    }

    #[tokio::test]
    async fn docx_export_unavailable_is_reported() {
        let base = serve(FakeCompletion::replying(Ok("unused".to_string()))).await;
        let response = post_form(format!("{}/export/docx", base), &[("html", "<p>x</p>"), ("rtl", "1")]).await;
        assert_eq!(response.status().as_u16(), 503);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "ExportUnavailable");
        assert_eq!(body["success"], false);
    }
}
