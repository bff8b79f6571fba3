use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::clipboard::Clipboard;
use crate::form::{FormError, FormEvent, FormState};
use crate::models::{FormView, Screenshot};
use crate::webhook::Analyzer;

pub const COPY_FEEDBACK: Duration = Duration::from_millis(2000);

struct Inner {
    state: FormState,
    copy_timer: Option<JoinHandle<()>>,
}

impl Inner {
    fn dispatch(&mut self, event: FormEvent) -> Result<(), FormError> {
        self.state = self.state.apply(event)?;
        Ok(())
    }

    /// For events `FormState::apply` never rejects.
    fn record(&mut self, event: FormEvent) {
        if let Err(e) = self.dispatch(event) {
            tracing::warn!(error = %e, "form event unexpectedly rejected");
        }
    }
}

/// Owns one form and runs its actions. The lock is never held across the
/// webhook call or the clipboard write.
pub struct FormController<A> {
    inner: Arc<Mutex<Inner>>,
    analyzer: Arc<A>,
    clipboard: Arc<dyn Clipboard>,
}

impl<A: Analyzer> FormController<A> {
    pub fn new(analyzer: Arc<A>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: FormState::new(),
                copy_timer: None,
            })),
            analyzer,
            clipboard,
        }
    }

    pub async fn view(&self) -> FormView {
        self.inner.lock().await.state.view()
    }

    pub async fn screenshot(&self, index: usize) -> Option<Screenshot> {
        self.inner.lock().await.state.screenshots.get(index).cloned()
    }

    pub async fn set_url(&self, url: String) -> FormView {
        let mut inner = self.inner.lock().await;
        inner.record(FormEvent::UrlChanged(url));
        inner.state.view()
    }

    pub async fn add_files(&self, files: Vec<Screenshot>) -> Result<FormView, FormError> {
        let mut inner = self.inner.lock().await;
        let count = files.len();
        inner.dispatch(FormEvent::FilesAdded(files)).map_err(|e| {
            tracing::warn!(rejected = count, error = %e, "screenshots rejected");
            e
        })?;
        tracing::info!(
            added = count,
            total = inner.state.screenshots.len(),
            "screenshots added"
        );
        Ok(inner.state.view())
    }

    pub async fn remove_file(&self, index: usize) -> FormView {
        let mut inner = self.inner.lock().await;
        inner.record(FormEvent::FileRemoved(index));
        inner.state.view()
    }

    /// Runs one submission. `loading` is cleared on every path past
    /// validation, including when the caller stops waiting: the webhook call
    /// and its settlement run on their own task.
    pub async fn submit(&self) -> Result<String, FormError> {
        let request = {
            let mut inner = self.inner.lock().await;
            inner.dispatch(FormEvent::SubmitStarted)?;
            inner.state.submission()
        };

        let analyzer = Arc::clone(&self.analyzer);
        let shared = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = analyzer.analyze(&request).await;
            let mut inner = shared.lock().await;
            match outcome {
                Ok(output) => {
                    tracing::info!(chars = output.chars().count(), "analysis received");
                    inner.record(FormEvent::SubmitSucceeded(output.clone()));
                    Ok(output)
                }
                Err(e) => {
                    tracing::error!(error = %e, "analysis failed");
                    inner.record(FormEvent::SubmitFailed);
                    Err(FormError::AnalysisFailed)
                }
            }
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "analysis task did not finish");
                self.inner.lock().await.record(FormEvent::SubmitFailed);
                Err(FormError::AnalysisFailed)
            }
        }
    }

    /// Copies the result and raises `copied` for [`COPY_FEEDBACK`]. Calling it
    /// again restarts the revert timer.
    pub async fn copy_result(&self) -> Result<String, FormError> {
        let text = {
            let inner = self.inner.lock().await;
            inner.state.apply(FormEvent::Copied)?.result_text
        };

        self.clipboard
            .write_text(text.clone())
            .await
            .map_err(|e| {
                tracing::error!(clipboard = self.clipboard.name(), error = %e, "copy failed");
                FormError::Clipboard(e.to_string())
            })?;

        let mut inner = self.inner.lock().await;
        inner.dispatch(FormEvent::Copied)?;
        let generation = inner.state.copy_generation;

        if let Some(previous) = inner.copy_timer.take() {
            previous.abort();
        }
        let shared = Arc::clone(&self.inner);
        inner.copy_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(COPY_FEEDBACK).await;
            shared
                .lock()
                .await
                .record(FormEvent::CopyExpired(generation));
        }));

        Ok(text)
    }
}
