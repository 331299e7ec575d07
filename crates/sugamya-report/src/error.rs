//! Report error types.

use thiserror::Error;

/// Errors raised while producing or rendering a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing the rendered output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The report could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
