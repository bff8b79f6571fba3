use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use clap::Parser;
use serde_json::json;

mod clipboard;
mod config;
mod controller;
mod form;
mod models;
mod page;
mod sessions;
mod webhook;

use clipboard::{BrowserClipboard, Clipboard, SystemClipboard};
use config::{ClipboardMode, Config};
use controller::FormController;
use form::FormError;
use models::{CopyResponse, Screenshot, SubmitResponse, UrlUpdate};
use sessions::FormSessions;
use uuid::Uuid;
use webhook::WebhookClient;

type SharedSessions = Arc<FormSessions<WebhookClient>>;
type SharedForm = Arc<FormController<WebhookClient>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::parse();

    if config.insecure_ssl {
        tracing::warn!("TLS certificate validation disabled for the webhook");
    }
    let webhook = WebhookClient::new(
        config.webhook_url.clone(),
        config.insecure_ssl,
        config.timeout(),
    )
    .context("failed to build webhook client")?;
    tracing::info!(webhook = %webhook.endpoint(), "webhook configured");

    let clipboard = select_clipboard(config.clipboard).context("failed to open clipboard")?;
    tracing::info!(clipboard = clipboard.name(), "clipboard selected");

    let sessions = Arc::new(FormSessions::new(webhook, clipboard, config.session_ttl()));
    let app = router(sessions, config.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn select_clipboard(mode: ClipboardMode) -> Result<Arc<dyn Clipboard>, clipboard::ClipboardError> {
    match mode {
        ClipboardMode::System => Ok(Arc::new(SystemClipboard::open()?)),
        ClipboardMode::Browser => Ok(Arc::new(BrowserClipboard)),
        ClipboardMode::Auto => match SystemClipboard::open() {
            Ok(board) => Ok(Arc::new(board)),
            Err(e) => {
                tracing::warn!(error = %e, "no system clipboard, copies are left to the browser");
                Ok(Arc::new(BrowserClipboard))
            }
        },
    }
}

fn router(sessions: SharedSessions, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/form/:session", get(form_view))
        .route("/api/form/:session/url", put(update_url))
        .route("/api/form/:session/screenshots", post(add_screenshots))
        .route(
            "/api/form/:session/screenshots/:index",
            get(screenshot_preview).delete(remove_screenshot),
        )
        .route("/api/form/:session/submit", post(submit))
        .route("/api/form/:session/copy", post(copy_result))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(sessions)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// Every page load gets an empty form of its own.
async fn index(State(sessions): State<SharedSessions>) -> Html<String> {
    let session = sessions.open().await;
    Html(page::index_html(&session.to_string()))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn form_view(
    State(sessions): State<SharedSessions>,
    Path(session): Path<Uuid>,
) -> Response {
    match lookup(&sessions, session).await {
        Ok(form) => Json(form.view().await).into_response(),
        Err(response) => response,
    }
}

async fn update_url(
    State(sessions): State<SharedSessions>,
    Path(session): Path<Uuid>,
    Json(req): Json<UrlUpdate>,
) -> Response {
    match lookup(&sessions, session).await {
        Ok(form) => Json(form.set_url(req.url).await).into_response(),
        Err(response) => response,
    }
}

async fn add_screenshots(
    State(sessions): State<SharedSessions>,
    Path(session): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let form = match lookup(&sessions, session).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let files = match read_screenshots(&mut multipart).await {
        Ok(files) => files,
        Err(e) => return error_response(&e),
    };
    match form.add_files(files).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn screenshot_preview(
    State(sessions): State<SharedSessions>,
    Path((session, index)): Path<(Uuid, usize)>,
) -> Response {
    let form = match lookup(&sessions, session).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    match form.screenshot(index).await {
        Some(shot) => (
            [
                (header::CONTENT_TYPE, shot.content_type),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            shot.data,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Capture introuvable"})),
        )
            .into_response(),
    }
}

async fn remove_screenshot(
    State(sessions): State<SharedSessions>,
    Path((session, index)): Path<(Uuid, usize)>,
) -> Response {
    match lookup(&sessions, session).await {
        Ok(form) => Json(form.remove_file(index).await).into_response(),
        Err(response) => response,
    }
}

async fn submit(State(sessions): State<SharedSessions>, Path(session): Path<Uuid>) -> Response {
    let form = match lookup(&sessions, session).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    match form.submit().await {
        Ok(output) => (StatusCode::OK, Json(SubmitResponse { output })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn copy_result(
    State(sessions): State<SharedSessions>,
    Path(session): Path<Uuid>,
) -> Response {
    let form = match lookup(&sessions, session).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    match form.copy_result().await {
        Ok(text) => Json(CopyResponse { text, copied: true }).into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Collects every uploaded file of the request. Empty file inputs are skipped.
async fn read_screenshots(multipart: &mut Multipart) -> Result<Vec<Screenshot>, FormError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FormError::Upload(e.body_text()))?
    {
        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| FormError::Upload(e.body_text()))?;

        if file_name.is_empty() && data.is_empty() {
            continue;
        }
        files.push(Screenshot::new(file_name, content_type, data));
    }
    Ok(files)
}

async fn lookup(sessions: &SharedSessions, id: Uuid) -> Result<SharedForm, Response> {
    sessions
        .get(id)
        .await
        .ok_or_else(|| error_response(&FormError::SessionExpired))
}

fn error_response(e: &FormError) -> Response {
    let status = match e {
        FormError::MissingUrl
        | FormError::InvalidUrl(_)
        | FormError::NoScreenshots
        | FormError::TooManyScreenshots
        | FormError::Upload(_) => StatusCode::BAD_REQUEST,
        FormError::NotAnImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        FormError::NothingToCopy => StatusCode::CONFLICT,
        FormError::SessionExpired => StatusCode::NOT_FOUND,
        FormError::AnalysisFailed => StatusCode::BAD_GATEWAY,
        FormError::Clipboard(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"detail": e.to_string()}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use reqwest::multipart::{Form, Part};
    use serde_json::Value;
    use std::time::Duration;
    use url::Url;

    async fn spawn_app(webhook: &str) -> String {
        let client = WebhookClient::new(Url::parse(webhook).unwrap(), false, None).unwrap();
        let sessions = Arc::new(FormSessions::new(
            client,
            Arc::new(BrowserClipboard),
            Duration::from_secs(3600),
        ));
        let app = router(sessions, 10 * 1024 * 1024);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Loads the page like a browser would and returns its form API base.
    async fn load_page(http: &reqwest::Client, base: &str) -> String {
        let html = http
            .get(format!("{}/", base))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("Analyser le site"));
        let marker = "const api = '";
        let start = html.find(marker).unwrap() + marker.len();
        let end = start + html[start..].find('\'').unwrap();
        format!("{}{}", base, &html[start..end])
    }

    fn upload(names: &[&str]) -> Form {
        names.iter().fold(Form::new(), |form, name| {
            form.part(
                "screenshots",
                Part::bytes(name.as_bytes().to_vec())
                    .file_name(name.to_string())
                    .mime_str("image/png")
                    .unwrap(),
            )
        })
    }

    async fn get_json(http: &reqwest::Client, url: String) -> Value {
        http.get(url).send().await.unwrap().json().await.unwrap()
    }

    #[tokio::test]
    async fn full_round_through_the_form() {
        let mut server = Server::new_async().await;
        let hook = server
            .mock("POST", "/webhook/x")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"output":"Votre site est rapide"}"#)
            .expect(1)
            .create_async()
            .await;
        let base = spawn_app(&format!("{}/webhook/x", server.url())).await;
        let http = reqwest::Client::new();
        let api = load_page(&http, &base).await;

        http.put(format!("{}/url", api))
            .json(&json!({"url": "https://example.com"}))
            .send()
            .await
            .unwrap();

        let view: Value = http
            .post(format!("{}/screenshots", api))
            .multipart(upload(&["a.png", "b.png", "c.png"]))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["screenshots"].as_array().unwrap().len(), 3);

        let view: Value = http
            .delete(format!("{}/screenshots/1", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let names: Vec<_> = view["screenshots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["file_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "c.png"]);

        let preview = http
            .get(format!("{}/screenshots/1", api))
            .send()
            .await
            .unwrap();
        assert_eq!(preview.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(preview.bytes().await.unwrap().as_ref(), b"c.png");

        let submitted = http
            .post(format!("{}/submit", api))
            .send()
            .await
            .unwrap();
        assert_eq!(submitted.status(), reqwest::StatusCode::OK);
        let body: Value = submitted.json().await.unwrap();
        assert_eq!(body["output"], "Votre site est rapide");
        hook.assert_async().await;

        let copied: Value = http
            .post(format!("{}/copy", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(copied["text"], "Votre site est rapide");

        let view = get_json(&http, api.clone()).await;
        assert_eq!(view["result_text"], "Votre site est rapide");
        assert_eq!(view["loading"], false);
        assert_eq!(view["copied"], true);
    }

    #[tokio::test]
    async fn reload_starts_from_an_empty_form() {
        let base = spawn_app("http://127.0.0.1:9/webhook").await;
        let http = reqwest::Client::new();

        let first = load_page(&http, &base).await;
        http.put(format!("{}/url", first))
            .json(&json!({"url": "https://example.com"}))
            .send()
            .await
            .unwrap();
        http.post(format!("{}/screenshots", first))
            .multipart(upload(&["a.png"]))
            .send()
            .await
            .unwrap();

        let reloaded = load_page(&http, &base).await;
        assert_ne!(first, reloaded);
        let view = get_json(&http, reloaded).await;
        assert_eq!(view["url"], "");
        assert_eq!(view["screenshots"].as_array().unwrap().len(), 0);
        assert_eq!(view["loading"], false);

        // Another tab keeps its own form.
        let view = get_json(&http, first).await;
        assert_eq!(view["screenshots"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let base = spawn_app("http://127.0.0.1:9/webhook").await;
        let response = reqwest::Client::new()
            .get(format!("{}/api/form/{}", base, Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Session expirée, veuillez recharger la page");
    }

    #[tokio::test]
    async fn submit_without_screenshots_is_a_bad_request() {
        let mut server = Server::new_async().await;
        let hook = server
            .mock("POST", "/webhook/x")
            .expect(0)
            .create_async()
            .await;
        let base = spawn_app(&format!("{}/webhook/x", server.url())).await;
        let http = reqwest::Client::new();
        let api = load_page(&http, &base).await;

        http.put(format!("{}/url", api))
            .json(&json!({"url": "https://example.com"}))
            .send()
            .await
            .unwrap();
        let response = http
            .post(format!("{}/submit", api))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["detail"],
            "Veuillez ajouter au moins une capture d'écran"
        );
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_failure_is_a_bad_gateway() {
        let mut server = Server::new_async().await;
        let _hook = server
            .mock("POST", "/webhook/x")
            .with_status(500)
            .create_async()
            .await;
        let base = spawn_app(&format!("{}/webhook/x", server.url())).await;
        let http = reqwest::Client::new();
        let api = load_page(&http, &base).await;

        http.put(format!("{}/url", api))
            .json(&json!({"url": "https://example.com"}))
            .send()
            .await
            .unwrap();
        http.post(format!("{}/screenshots", api))
            .multipart(upload(&["a.png"]))
            .send()
            .await
            .unwrap();

        let response = http
            .post(format!("{}/submit", api))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

        let view = get_json(&http, api).await;
        assert_eq!(view["result_text"], "");
        assert_eq!(view["loading"], false);
    }

    #[tokio::test]
    async fn too_many_uploads_are_rejected() {
        let base = spawn_app("http://127.0.0.1:9/webhook").await;
        let http = reqwest::Client::new();
        let api = load_page(&http, &base).await;

        let response = http
            .post(format!("{}/screenshots", api))
            .multipart(upload(&["1.png", "2.png", "3.png", "4.png", "5.png"]))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let missing = http
            .get(format!("{}/screenshots/0", api))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
