use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// An image attached to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Screenshot {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

#[derive(Debug, Deserialize)]
pub struct UrlUpdate {
    pub url: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ScreenshotInfo {
    pub index: usize,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

/// What the page renders.
#[derive(Debug, Serialize, Clone)]
pub struct FormView {
    pub url: String,
    pub screenshots: Vec<ScreenshotInfo>,
    pub max_screenshots: usize,
    pub loading: bool,
    pub result_text: String,
    pub copied: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct CopyResponse {
    pub text: String,
    pub copied: bool,
}
