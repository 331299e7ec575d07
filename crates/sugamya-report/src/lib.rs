//! Sugamya Report - the aggregation and scoring engine.
//!
//! Everything here is pure and deterministic, recomputed from a scan's issues
//! and compliance result every time a report is requested:
//!
//! - [`aggregate`] - grouping by rule and per-severity breakdown
//! - [`risk`] - business risk score and India-specific compliance status
//! - [`sector`] - sector detection and its regulatory guidance
//! - [`wcag`] - WCAG annotation and conformance level
//! - [`report`] - the assembled [`AccessibilityReport`]
//! - [`render`] - the seam to an external rendering stage

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod aggregate;
pub mod error;
pub mod render;
pub mod report;
pub mod risk;
pub mod sector;
pub mod wcag;

pub use aggregate::{group_issues, GroupedIssue, SeverityBreakdown};
pub use error::{ReportError, Result};
pub use render::{JsonReportRenderer, ReportRenderer};
pub use report::AccessibilityReport;
pub use risk::{BusinessRisk, ComplianceStatus, RiskLevel};
pub use sector::{detect_sector, Sector, SectorGuidance};
pub use wcag::{ConformanceLevel, Principle, WcagIssue, WcagLevel, WcagMapping};
