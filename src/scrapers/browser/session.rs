//! Primitives a controllable browser session must provide.

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a browser session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no element matches `{0}`")]
    ElementNotFound(String),

    #[error("browser did not respond within {secs}s during {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("{0}")]
    Protocol(String),

    #[error("session already closed")]
    Closed,
}

/// A single browser tab driven by selector-addressed primitives.
///
/// Clicks are script-level (`element.click()`), never native pointer events,
/// so obscured or lagging controls still receive them.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Whether at least one element matches.
    async fn has_element(&mut self, selector: &str) -> Result<bool, SessionError>;

    /// Number of matching elements.
    async fn count_elements(&mut self, selector: &str) -> Result<usize, SessionError>;

    /// Attribute of the first matching element.
    ///
    /// `Ok(None)` when the element exists without the attribute;
    /// [`SessionError::ElementNotFound`] when nothing matches.
    async fn attribute(&mut self, selector: &str, name: &str)
        -> Result<Option<String>, SessionError>;

    /// Synthetic click on the first matching element.
    async fn script_click(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Serialized markup of the current document.
    async fn content(&mut self) -> Result<String, SessionError>;

    /// Release the session. Later calls are no-ops.
    async fn close(&mut self) -> Result<(), SessionError>;
}
