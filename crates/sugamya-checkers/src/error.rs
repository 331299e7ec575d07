//! Checker error types.

use sugamya_browser::BrowserError;
use thiserror::Error;

/// Errors a checker can settle with. None of them fail the scan.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The checker ran but could not produce a result.
    #[error("{checker} evaluation failed: {reason}")]
    Evaluation {
        /// Checker name
        checker: &'static str,
        /// What went wrong
        reason: String,
    },

    /// The independent scoring engine could not be reached or crashed.
    #[error("score engine unavailable: {0}")]
    ScoreEngineUnavailable(String),

    /// The shared page session went away while the checker was using it.
    #[error("session lost during {checker}: {reason}")]
    SessionLost {
        /// Checker name
        checker: &'static str,
        /// Detail from the browser layer
        reason: String,
    },
}

impl CheckerError {
    /// Wrap a browser error raised while `checker` was running.
    #[must_use]
    pub fn from_browser(checker: &'static str, err: BrowserError) -> Self {
        match err {
            BrowserError::SessionLost(reason) => Self::SessionLost { checker, reason },
            other => Self::Evaluation {
                checker,
                reason: other.to_string(),
            },
        }
    }

    /// Machine-readable kind stored in scan diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Evaluation { .. } => "evaluation",
            Self::ScoreEngineUnavailable(_) => "score_engine_unavailable",
            Self::SessionLost { .. } => "session_lost",
        }
    }
}

/// Result type alias for checker operations.
pub type Result<T> = std::result::Result<T, CheckerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_browser_keeps_session_loss() {
        let err = CheckerError::from_browser(
            "axe",
            BrowserError::SessionLost("target closed".to_string()),
        );
        assert!(matches!(err, CheckerError::SessionLost { checker: "axe", .. }));
        assert_eq!(err.kind(), "session_lost");
    }

    #[test]
    fn test_from_browser_other_is_evaluation() {
        let err = CheckerError::from_browser(
            "compliance",
            BrowserError::Evaluation("ReferenceError".to_string()),
        );
        assert_eq!(err.kind(), "evaluation");
        assert!(err.to_string().contains("ReferenceError"));
    }
}
