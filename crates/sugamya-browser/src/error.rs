use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to launch browser: {0}")]
    LaunchFailure(String),

    #[error("navigation to {url} failed: {reason}")]
    NavigationFailure { url: String, reason: String },

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// The browser process, tab or frame went away mid-operation.
    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

impl BrowserError {
    /// Whether the underlying browser connection may be unrecoverable.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }
}
