//! Shared types used across Sugamya.
//!
//! This module defines the scan domain model: jobs, records, issues and the
//! diagnostics blob persisted alongside each scan.

use crate::error::SugamyaError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for scan identifiers with validation.
///
/// Scan IDs must be valid UUIDs (v4 format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(String);

impl ScanId {
    /// Create a new `ScanId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID v4.
    pub fn new(id: impl Into<String>) -> Result<Self, SugamyaError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a new random `ScanId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), SugamyaError> {
        static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = UUID_REGEX.get_or_init(|| {
            Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
                .expect("valid regex")
        });

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(SugamyaError::InvalidScanId(id.to_string()))
        }
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Impact of an accessibility issue, ranked from worst to mildest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks access entirely for some users
    Critical,
    /// Seriously impairs access
    Serious,
    /// Causes friction but has workarounds
    Moderate,
    /// Cosmetic or best-practice
    Minor,
}

impl Severity {
    /// All severities in rank order.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Serious,
        Severity::Moderate,
        Severity::Minor,
    ];

    /// Sort rank: `critical` = 0 through `minor` = 3.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Serious => 1,
            Self::Moderate => 2,
            Self::Minor => 3,
        }
    }

    /// Map a rule engine's declared impact to a severity.
    ///
    /// Missing or unrecognised impacts default to `moderate`.
    #[must_use]
    pub fn from_impact(impact: Option<&str>) -> Self {
        impact
            .and_then(|value| value.parse().ok())
            .unwrap_or(Self::Moderate)
    }

    /// Lowercase string form used in storage and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Serious => "serious",
            Self::Moderate => "moderate",
            Self::Minor => "minor",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SugamyaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "serious" => Ok(Self::Serious),
            "moderate" => Ok(Self::Moderate),
            "minor" => Ok(Self::Minor),
            other => Err(SugamyaError::UnknownSeverity(other.to_string())),
        }
    }
}

/// Lifecycle status of a scan record.
///
/// Transitions are monotonic: `queued → processing → {completed | failed}`.
/// A queued scan may also fail directly (shutdown, early rejection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// A worker is running the scan
    Processing,
    /// Scan finished and results are stored
    Completed,
    /// Scan failed; see `Diagnostics::failure`
    Failed,
}

impl ScanStatus {
    /// Lowercase string form used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions are allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// `processing → processing` is allowed so batch parents can report
    /// progress without changing state.
    #[must_use]
    pub fn can_transition_to(self, next: ScanStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Processing | Self::Failed)
            | (Self::Processing, Self::Processing | Self::Completed | Self::Failed) => true,
            _ => false,
        }
    }

    /// Statuses from which `next` may be reached.
    #[must_use]
    pub fn predecessors(next: ScanStatus) -> &'static [ScanStatus] {
        match next {
            Self::Queued => &[],
            Self::Processing | Self::Failed => &[Self::Queued, Self::Processing],
            Self::Completed => &[Self::Processing],
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = SugamyaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(SugamyaError::UnknownStatus(other.to_string())),
        }
    }
}

/// A single accessibility finding produced by the structural rule checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Rule identifier, e.g. `color-contrast`
    pub rule_id: String,
    /// Impact of the violation
    pub severity: Severity,
    /// CSS selector of the offending node
    pub selector: Option<String>,
    /// HTML snippet of the offending node
    pub snippet: Option<String>,
    /// Human-readable description of the rule
    pub description: String,
}

impl Issue {
    /// Create an issue with no node information.
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            selector: None,
            snippet: None,
            description: description.into(),
        }
    }

    /// Attach the offending node's selector.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Attach the offending node's HTML.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// A violation reported by the compliance-guideline checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    /// Guideline check identifier
    pub rule: String,
    /// What failed
    pub description: String,
    /// Impact of the failure
    pub severity: Severity,
}

/// Result of the compliance-guideline checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// True when no violations were found
    pub passed: bool,
    /// Number of checks in the guideline set
    pub total_checks: u32,
    /// Number of checks that ran and passed
    pub passed_checks: u32,
    /// Independent, order-insensitive violations
    pub violations: Vec<ComplianceViolation>,
    /// Checks whose evaluation errored and were excluded from the tally
    #[serde(default)]
    pub not_evaluated: Vec<String>,
}

/// Raw per-rule violation from the structural rule engine, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    /// Rule identifier
    pub id: String,
    /// Declared impact, if any
    pub impact: Option<String>,
    /// Rule description
    pub description: String,
    /// Short help text
    pub help: String,
    /// Link to rule documentation
    pub help_url: Option<String>,
    /// Number of offending nodes
    pub node_count: usize,
}

/// Machine-readable reason code for a failed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The process was draining when the scan would have started
    ServerShutdown,
    /// Navigation to the target failed
    NavigationFailed,
    /// The page or its frame detached during navigation
    FrameDetached,
    /// The browser process went away mid-scan
    BrowserClosed,
    /// Navigation exceeded its time budget
    Timeout,
    /// A dependency refused the connection
    ConnectionRefused,
    /// The target URL was not `http(s)`
    InvalidUrl,
    /// The browser could not be launched
    LaunchFailed,
    /// Anything else
    Unknown,
}

impl FailureReason {
    /// Reason code string surfaced to API consumers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerShutdown => "server_shutdown",
            Self::NavigationFailed => "navigation_failed",
            Self::FrameDetached => "frame_detached",
            Self::BrowserClosed => "browser_closed",
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection_refused",
            Self::InvalidUrl => "invalid_url",
            Self::LaunchFailed => "launch_failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure stored on a failed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    /// Reason code
    pub reason: FailureReason,
    /// Operator-facing detail; never a stack trace
    pub message: String,
}

/// A checker that failed without failing the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerFailure {
    /// Checker name
    pub checker: String,
    /// Error kind, e.g. `score_engine_unavailable`
    pub kind: String,
    /// Error detail
    pub message: String,
}

/// Structured metadata persisted with a scan record.
///
/// Absent data is explicit: a `None` compliance result means the checker did
/// not produce one, never that it passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    /// Compliance-guideline result, if the checker succeeded
    pub compliance: Option<ComplianceResult>,
    /// Raw rule-engine violations, if the checker succeeded
    pub rule_violations: Option<Vec<RuleViolation>>,
    /// Checkers that failed
    pub checker_errors: Vec<CheckerFailure>,
    /// Checkers skipped because the session was unavailable
    pub skipped_checkers: Vec<String>,
    /// Present when the scan itself failed
    pub failure: Option<ScanFailure>,
}

impl Diagnostics {
    /// Diagnostics describing a failed scan.
    #[must_use]
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            failure: Some(ScanFailure {
                reason,
                message: message.into(),
            }),
            ..Self::default()
        }
    }
}

/// A unit of work for the orchestrator. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    /// Record this job reports into
    pub scan_id: ScanId,
    /// Website the scan belongs to
    pub website_id: String,
    /// Page URL to audit
    pub target_url: String,
    /// Batch parent, if this job is one page of a batch
    pub parent_scan_id: Option<ScanId>,
}

impl ScanJob {
    /// Whether the job is one page of a multi-page batch.
    #[must_use]
    pub fn is_batch_child(&self) -> bool {
        self.parent_scan_id.is_some()
    }
}

/// Parameters for creating a scan record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScan {
    /// Website the scan belongs to
    pub website_id: String,
    /// Page or site URL
    pub url: String,
    /// Batch parent, if any
    pub parent_scan_id: Option<ScanId>,
    /// Number of pages for a batch parent, 1 otherwise
    pub total_pages: u32,
}

impl NewScan {
    /// A single-page scan.
    #[must_use]
    pub fn single(website_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            website_id: website_id.into(),
            url: url.into(),
            parent_scan_id: None,
            total_pages: 1,
        }
    }
}

/// Persisted state of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Scan identifier
    pub id: ScanId,
    /// Website the scan belongs to
    pub website_id: String,
    /// Page or site URL
    pub url: String,
    /// Lifecycle status
    pub status: ScanStatus,
    /// Accessibility score 0-100, absent when the score engine failed
    pub score: Option<u8>,
    /// Issues in insertion order
    pub findings: Vec<Issue>,
    /// Structured metadata
    pub diagnostics: Diagnostics,
    /// Pages in the batch (1 for single scans)
    pub total_pages: u32,
    /// Batch pages completed so far
    pub completed_pages: u32,
    /// Batch parent, if any
    pub parent_scan_id: Option<ScanId>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record last changed
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_roundtrip() {
        let id = ScanId::generate();
        let parsed = ScanId::new(id.as_str()).expect("generated id is valid");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_scan_id_rejects_garbage() {
        assert!(ScanId::new("scan-1").is_err());
        assert!(ScanId::new("").is_err());
    }

    #[test]
    fn test_severity_rank_order() {
        let ranks: Vec<u8> = Severity::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(Severity::Critical < Severity::Minor);
    }

    #[test]
    fn test_severity_from_impact_defaults_to_moderate() {
        assert_eq!(Severity::from_impact(Some("critical")), Severity::Critical);
        assert_eq!(Severity::from_impact(Some("Serious")), Severity::Serious);
        assert_eq!(Severity::from_impact(None), Severity::Moderate);
        assert_eq!(Severity::from_impact(Some("bogus")), Severity::Moderate);
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        use ScanStatus::{Completed, Failed, Processing, Queued};

        assert!(Queued.can_transition_to(Processing));
        assert!(Queued.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Processing));

        assert!(!Queued.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Queued));
    }

    #[test]
    fn test_predecessors_match_transitions() {
        use ScanStatus::{Completed, Failed, Processing, Queued};
        for next in [Queued, Processing, Completed, Failed] {
            for from in [Queued, Processing, Completed, Failed] {
                assert_eq!(
                    ScanStatus::predecessors(next).contains(&from),
                    from.can_transition_to(next),
                    "{from} -> {next}"
                );
            }
        }
    }

    #[test]
    fn test_failure_reason_serializes_as_code() {
        let json = serde_json::to_string(&FailureReason::ServerShutdown).expect("serialize");
        assert_eq!(json, "\"server_shutdown\"");
        assert_eq!(FailureReason::FrameDetached.as_str(), "frame_detached");
    }

    #[test]
    fn test_diagnostics_partial_json() {
        let diagnostics: Diagnostics =
            serde_json::from_str(r#"{"skipped_checkers":["axe"]}"#).expect("parse");
        assert_eq!(diagnostics.skipped_checkers, vec!["axe".to_string()]);
        assert!(diagnostics.compliance.is_none());
        assert!(diagnostics.failure.is_none());
    }
}
