//! Report assembly.

use crate::aggregate::{group_issues, GroupedIssue, SeverityBreakdown};
use crate::risk::{BusinessRisk, ComplianceStatus};
use crate::sector::{detect_sector, Sector, SectorGuidance};
use crate::wcag::{categorize, summarize_principles, ConformanceLevel, PrincipleSummary, WcagIssue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sugamya_core::{CheckerFailure, ComplianceResult, ScanFailure, ScanId, ScanRecord, ScanStatus};

/// Fully aggregated report handed to a renderer.
///
/// Derived fresh from a [`ScanRecord`] on every request; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AccessibilityReport {
    /// Scan identifier
    pub scan_id: ScanId,
    /// Scanned URL
    pub url: String,
    /// Scan status at generation time
    pub status: ScanStatus,
    /// Independent accessibility score, absent when unavailable
    pub score: Option<u8>,
    /// When the scan was created
    pub scanned_at: DateTime<Utc>,
    /// When this report was assembled
    pub generated_at: DateTime<Utc>,
    /// Per-severity counts
    pub breakdown: SeverityBreakdown,
    /// Issues grouped by rule
    pub grouped_issues: Vec<GroupedIssue>,
    /// Business risk assessment
    pub business_risk: BusinessRisk,
    /// Regulatory compliance status
    pub compliance_status: ComplianceStatus,
    /// Detected sector
    pub sector: Sector,
    /// Guidance for the sector
    pub sector_guidance: SectorGuidance,
    /// Every issue with its WCAG category
    pub issues: Vec<WcagIssue>,
    /// Per-principle summary
    pub categories: Vec<PrincipleSummary>,
    /// Derived WCAG conformance level
    pub conformance: ConformanceLevel,
    /// GIGW guideline result, absent when the checker did not produce one
    pub gigw: Option<ComplianceResult>,
    /// Checkers that failed or were skipped
    pub checker_errors: Vec<CheckerFailure>,
    /// Checkers skipped because the session was unavailable
    pub skipped_checkers: Vec<String>,
    /// Why the scan failed, if it did
    pub failure: Option<ScanFailure>,
}

impl AccessibilityReport {
    /// Aggregate a scan record.
    #[must_use]
    pub fn build(record: &ScanRecord) -> Self {
        Self::build_at(record, Utc::now())
    }

    /// Aggregate a scan record with an explicit generation time.
    #[must_use]
    pub fn build_at(record: &ScanRecord, generated_at: DateTime<Utc>) -> Self {
        let breakdown = SeverityBreakdown::from_issues(&record.findings);
        let issues = categorize(&record.findings);
        let sector = detect_sector(&record.url);
        let diagnostics = &record.diagnostics;

        Self {
            scan_id: record.id.clone(),
            url: record.url.clone(),
            status: record.status,
            score: record.score,
            scanned_at: record.created_at,
            generated_at,
            grouped_issues: group_issues(&record.findings),
            business_risk: BusinessRisk::assess(&breakdown),
            compliance_status: ComplianceStatus::classify(&breakdown),
            breakdown,
            sector,
            sector_guidance: sector.guidance(),
            categories: summarize_principles(&issues),
            conformance: ConformanceLevel::derive(&issues),
            issues,
            gigw: diagnostics.compliance.clone(),
            checker_errors: diagnostics.checker_errors.clone(),
            skipped_checkers: diagnostics.skipped_checkers.clone(),
            failure: diagnostics.failure.clone(),
        }
    }
}
