//! Sugamya Checkers - independent analyzers run against one page session.
//!
//! Each checker implements [`Checker`] and settles into a
//! [`CheckerOutcome`]: succeeded, failed, or skipped. A failing checker never
//! affects its siblings.
//!
//! - [`axe::AxeChecker`] - structural rule engine (axe-core) producing issues
//! - [`compliance::ComplianceChecker`] - eight GIGW guideline checks
//! - [`score::ScoreChecker`] - accessibility score from an independent engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod axe;
pub mod checker;
pub mod compliance;
pub mod error;
pub mod score;

pub use axe::{AxeChecker, AxeFindings, AxeSource};
pub use checker::{Checker, CheckerOutcome};
pub use compliance::ComplianceChecker;
pub use error::{CheckerError, Result};
pub use score::{LighthouseEngine, ScoreChecker, ScoreEngine};
