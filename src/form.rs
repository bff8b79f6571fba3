use url::Url;

use crate::models::{FormView, Screenshot, ScreenshotInfo};

// ── Constants ────────────────────────────────────────────────────────────────

pub const MAX_SCREENSHOTS: usize = 4;

// ── Error type ───────────────────────────────────────────────────────────────

/// Everything a form action can be rejected with. The display strings are the
/// alerts shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Veuillez saisir l'URL du site")]
    MissingUrl,
    #[error("URL invalide : {0}")]
    InvalidUrl(String),
    #[error("Veuillez ajouter au moins une capture d'écran")]
    NoScreenshots,
    #[error("Maximum 4 captures d'écran autorisées")]
    TooManyScreenshots,
    #[error("Le fichier {0} n'est pas une image")]
    NotAnImage(String),
    #[error("Aucun résultat à copier")]
    NothingToCopy,
    #[error("Une erreur est survenue lors de l'analyse")]
    AnalysisFailed,
    #[error("Impossible de copier dans le presse-papiers : {0}")]
    Clipboard(String),
    #[error("Envoi des fichiers impossible : {0}")]
    Upload(String),
    #[error("Session expirée, veuillez recharger la page")]
    SessionExpired,
}

// ── State and events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub url: String,
    pub screenshots: Vec<Screenshot>,
    pub loading: bool,
    pub result_text: String,
    pub copied: bool,
    /// Bumped on every copy so that only the latest revert timer clears `copied`.
    pub copy_generation: u64,
}

#[derive(Debug, Clone)]
pub enum FormEvent {
    UrlChanged(String),
    FilesAdded(Vec<Screenshot>),
    FileRemoved(usize),
    SubmitStarted,
    SubmitSucceeded(String),
    SubmitFailed,
    Copied,
    CopyExpired(u64),
}

/// The payload sent to the webhook, captured when a submission starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub url: String,
    pub screenshots: Vec<Screenshot>,
}

impl SubmissionRequest {
    /// Multipart field names paired with their files, in insertion order.
    pub fn keyed_screenshots(&self) -> impl Iterator<Item = (String, &Screenshot)> {
        self.screenshots
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("screenshot_{}", i), s))
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the next state. On `Err` the caller keeps `self` as is.
    pub fn apply(&self, event: FormEvent) -> Result<FormState, FormError> {
        let mut next = self.clone();
        match event {
            FormEvent::UrlChanged(url) => {
                next.url = url.trim().to_string();
            }
            FormEvent::FilesAdded(files) => {
                if files.is_empty() {
                    return Ok(next);
                }
                if self.screenshots.len() + files.len() > MAX_SCREENSHOTS {
                    return Err(FormError::TooManyScreenshots);
                }
                if let Some(bad) = files.iter().find(|f| !f.is_image()) {
                    return Err(FormError::NotAnImage(bad.file_name.clone()));
                }
                next.screenshots.extend(files);
            }
            FormEvent::FileRemoved(index) => {
                if index < next.screenshots.len() {
                    next.screenshots.remove(index);
                }
            }
            FormEvent::SubmitStarted => {
                self.validate_submission()?;
                next.loading = true;
            }
            FormEvent::SubmitSucceeded(output) => {
                next.result_text = output;
                next.loading = false;
            }
            FormEvent::SubmitFailed => {
                next.loading = false;
            }
            FormEvent::Copied => {
                if self.result_text.is_empty() {
                    return Err(FormError::NothingToCopy);
                }
                next.copied = true;
                next.copy_generation = self.copy_generation.wrapping_add(1);
            }
            FormEvent::CopyExpired(generation) => {
                if generation == self.copy_generation {
                    next.copied = false;
                }
            }
        }
        Ok(next)
    }

    pub fn validate_submission(&self) -> Result<(), FormError> {
        if self.url.is_empty() {
            return Err(FormError::MissingUrl);
        }
        Url::parse(&self.url).map_err(|_| FormError::InvalidUrl(self.url.clone()))?;
        if self.screenshots.is_empty() {
            return Err(FormError::NoScreenshots);
        }
        Ok(())
    }

    pub fn submission(&self) -> SubmissionRequest {
        SubmissionRequest {
            url: self.url.clone(),
            screenshots: self.screenshots.clone(),
        }
    }

    pub fn view(&self) -> FormView {
        FormView {
            url: self.url.clone(),
            screenshots: self
                .screenshots
                .iter()
                .enumerate()
                .map(|(index, s)| ScreenshotInfo {
                    index,
                    file_name: s.file_name.clone(),
                    content_type: s.content_type.clone(),
                    size: s.data.len(),
                })
                .collect(),
            max_screenshots: MAX_SCREENSHOTS,
            loading: self.loading,
            result_text: self.result_text.clone(),
            copied: self.copied,
        }
    }
}
