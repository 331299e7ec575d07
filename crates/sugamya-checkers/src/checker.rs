//! The checker capability and its per-invocation state machine.
//!
//! Every invocation moves `Idle → Running → {Succeeded, Failed, Skipped}`.
//! There are no retries within a scan attempt.

use crate::error::{CheckerError, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use sugamya_browser::PageSession;

/// An independent analyzer run against one page session.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Typed result on success.
    type Output: Send;

    /// Stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the checker evaluates inside the shared page.
    ///
    /// Checkers that bring their own engine return `false` and are never
    /// skipped because of a lost session.
    fn uses_session(&self) -> bool {
        true
    }

    /// Run the checker once.
    async fn run(&self, session: &dyn PageSession) -> Result<Self::Output>;
}

/// How a checker invocation settled.
#[derive(Debug)]
pub enum CheckerOutcome<T> {
    /// The checker produced a result
    Succeeded(T),
    /// The checker failed; the scan continues without its result
    Failed(CheckerError),
    /// The session was unavailable so the checker never ran
    Skipped,
}

impl<T> CheckerOutcome<T> {
    /// Run `checker` to completion and capture how it settled.
    ///
    /// Never returns early and never propagates a panic from the checker.
    pub async fn settle<C>(checker: &C, session: &dyn PageSession) -> Self
    where
        C: Checker<Output = T> + ?Sized,
    {
        let name = checker.name();

        if checker.uses_session() && session.is_lost() {
            tracing::warn!(
                checker = name,
                url = session.url(),
                "Checker skipped, session unavailable"
            );
            return Self::Skipped;
        }

        tracing::debug!(checker = name, url = session.url(), "Checker running");
        match AssertUnwindSafe(checker.run(session)).catch_unwind().await {
            Ok(Ok(output)) => {
                tracing::debug!(checker = name, "Checker succeeded");
                Self::Succeeded(output)
            }
            Ok(Err(err)) => {
                if matches!(err, CheckerError::SessionLost { .. }) {
                    session.mark_lost();
                }
                tracing::warn!(checker = name, "Checker failed: {}", err);
                Self::Failed(err)
            }
            Err(_) => {
                tracing::error!(checker = name, "Checker panicked");
                Self::Failed(CheckerError::Evaluation {
                    checker: name,
                    reason: "checker panicked".to_string(),
                })
            }
        }
    }

    /// The result, if the checker succeeded.
    pub fn into_output(self) -> Option<T> {
        match self {
            Self::Succeeded(output) => Some(output),
            Self::Failed(_) | Self::Skipped => None,
        }
    }

    /// Whether the checker succeeded.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The failure, if the checker failed.
    pub fn error(&self) -> Option<&CheckerError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Succeeded(_) | Self::Skipped => None,
        }
    }

    /// Whether the checker was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}
