use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::form::SubmissionRequest;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "site-analyzer/1.0";
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://n8n.srv992506.hstgr.cloud/webhook/3f0c7464-4b5b-44c3-b094-78d1527b6a45";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook returned status {0}")]
    Status(StatusCode),
    #[error("{0}")]
    Request(String),
    #[error("webhook body is not JSON: {0}")]
    InvalidBody(String),
    #[error("webhook response has no string `output` field")]
    MissingOutput,
}

// ── Network boundary ─────────────────────────────────────────────────────────

/// Anything that can turn a submission into the analysis text.
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<String, WebhookError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl WebhookClient {
    pub fn new(
        endpoint: Url,
        insecure: bool,
        timeout: Option<Duration>,
    ) -> Result<Self, WebhookError> {
        let mut builder = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| WebhookError::Request(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Analyzer for WebhookClient {
    async fn analyze(&self, request: &SubmissionRequest) -> Result<String, WebhookError> {
        let form = build_form(request)?;

        tracing::info!(
            url = %request.url,
            screenshots = request.screenshots.len(),
            "submitting to webhook"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::Request(format!("TimeoutError: {}", e))
                } else if e.is_connect() {
                    WebhookError::Request(format!("ConnectError: {}", e))
                } else {
                    WebhookError::Request(format!("RequestError: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WebhookError::InvalidBody(e.to_string()))?;
        tracing::debug!(response = %body, "webhook JSON response");

        extract_output(&body)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn build_form(request: &SubmissionRequest) -> Result<Form, WebhookError> {
    let mut form = Form::new().text("url", request.url.clone());
    for (key, screenshot) in request.keyed_screenshots() {
        let part = Part::bytes(screenshot.data.to_vec())
            .file_name(screenshot.file_name.clone())
            .mime_str(&screenshot.content_type)
            .map_err(|e| WebhookError::Request(e.to_string()))?;
        form = form.part(key, part);
    }
    Ok(form)
}

fn extract_output(body: &Value) -> Result<String, WebhookError> {
    body.get("output")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(WebhookError::MissingOutput)
}
