//! Errors raised while acquiring a category page.

use thiserror::Error;

use super::browser::SessionError;
use crate::storage::StorageError;

/// Failure of one category. Never escapes the orchestrator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("load-more control `{selector}` not found on {url}")]
    LoadControlNotFound { url: String, selector: String },

    #[error("browser session error: {0}")]
    BrowserSession(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<SessionError> for ScrapeError {
    fn from(err: SessionError) -> Self {
        ScrapeError::BrowserSession(err.to_string())
    }
}
