//! Scan pipeline errors and their persisted classification.

use sugamya_browser::BrowserError;
use sugamya_core::FailureReason;
use sugamya_db::DatabaseError;
use sugamya_report::ReportError;
use thiserror::Error;

/// Errors raised by the scan pipeline.
///
/// The orchestrator never lets one escape `run`; it classifies it into a
/// [`FailureReason`] and stores it on the scan record.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The process is draining; no new work starts.
    #[error("shutdown in progress")]
    ShutdownInProgress,

    /// The job queue is at capacity.
    #[error("job queue full ({capacity} pending)")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// The browser session could not be acquired.
    #[error("session acquisition failed: {0}")]
    Acquisition(#[source] BrowserError),

    /// The browser failed after the session was acquired.
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Persistence failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Report rendering failed.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl ScanError {
    /// Reason code stored on a failed scan.
    #[must_use]
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::ShutdownInProgress => FailureReason::ServerShutdown,
            Self::Acquisition(err) => match err {
                BrowserError::InvalidUrl { .. } => FailureReason::InvalidUrl,
                BrowserError::LaunchFailure(_) => FailureReason::LaunchFailed,
                BrowserError::NavigationFailure { .. } | BrowserError::Evaluation(_) => {
                    FailureReason::NavigationFailed
                }
                BrowserError::NavigationTimeout { .. } => FailureReason::Timeout,
                BrowserError::SessionLost(_) => FailureReason::FrameDetached,
            },
            Self::Browser(err) => match err {
                BrowserError::SessionLost(_) => FailureReason::BrowserClosed,
                BrowserError::NavigationTimeout { .. } => FailureReason::Timeout,
                _ => FailureReason::Unknown,
            },
            Self::Database(err) if err.is_connection_error() => FailureReason::ConnectionRefused,
            Self::Database(_) | Self::QueueFull { .. } | Self::Report(_) | Self::Unknown(_) => {
                FailureReason::Unknown
            }
        }
    }
}

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
