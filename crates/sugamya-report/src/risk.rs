//! Business risk and compliance status.
//!
//! Two independent classifications over the same [`SeverityBreakdown`].

use crate::aggregate::SeverityBreakdown;
use serde::Serialize;
use std::fmt;

const CRITICAL_WEIGHT: usize = 25;
const SERIOUS_WEIGHT: usize = 15;
const MODERATE_WEIGHT: usize = 8;
const MINOR_WEIGHT: usize = 2;

/// Displayed scores are capped here; the level uses the raw value.
pub const DISPLAY_CAP: usize = 100;

/// Business risk level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    /// Little exposure
    Low,
    /// Some exposure
    Medium,
    /// Significant exposure
    High,
    /// Immediate exposure
    Critical,
}

impl RiskLevel {
    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    fn narrative(self) -> &'static RiskNarrative {
        match self {
            Self::Critical => &CRITICAL_NARRATIVE,
            Self::High => &HIGH_NARRATIVE,
            Self::Medium => &MEDIUM_NARRATIVE,
            Self::Low => &LOW_NARRATIVE,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct RiskNarrative {
    legal_risk: &'static str,
    reputation_risk: &'static str,
    recommendations: &'static [&'static str],
}

static CRITICAL_NARRATIVE: RiskNarrative = RiskNarrative {
    legal_risk: "High likelihood of complaints under the RPwD Act 2016; barriers block users with disabilities from core services.",
    reputation_risk: "Severe. Users relying on assistive technology cannot complete key tasks and may report the site publicly.",
    recommendations: &[
        "Fix all critical issues immediately, starting with missing text alternatives and keyboard traps",
        "Assign an accessibility owner and schedule a follow-up audit within 30 days",
        "Publish an accessibility statement with a contact for reporting barriers",
    ],
};

static HIGH_NARRATIVE: RiskNarrative = RiskNarrative {
    legal_risk: "Material risk of non-compliance with GIGW 3.0 and IS 17802 requirements.",
    reputation_risk: "Significant. Many users will struggle with important journeys.",
    recommendations: &[
        "Resolve serious issues within the next release cycle",
        "Add automated accessibility checks to the deployment pipeline",
        "Test key journeys with a screen reader",
    ],
};

static MEDIUM_NARRATIVE: RiskNarrative = RiskNarrative {
    legal_risk: "Moderate risk; gaps are likely to be raised during a formal conformance review.",
    reputation_risk: "Noticeable friction for some users.",
    recommendations: &[
        "Plan fixes for moderate issues in upcoming sprints",
        "Review design components for contrast and labelling",
    ],
};

static LOW_NARRATIVE: RiskNarrative = RiskNarrative {
    legal_risk: "Low risk based on automated checks; manual review is still required for full conformance.",
    reputation_risk: "Minimal.",
    recommendations: &[
        "Keep monitoring with periodic scans",
        "Complement automated scans with manual assistive-technology testing",
    ],
};

/// Composite business risk for a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessRisk {
    /// Weighted score, uncapped
    pub raw_score: usize,
    /// Score for display, capped at [`DISPLAY_CAP`]
    pub score: usize,
    /// Risk level
    pub level: RiskLevel,
    /// Legal exposure narrative
    pub legal_risk: &'static str,
    /// Reputation exposure narrative
    pub reputation_risk: &'static str,
    /// Fixed recommendation list for the level
    pub recommendations: &'static [&'static str],
}

impl BusinessRisk {
    /// Score and classify a breakdown.
    #[must_use]
    pub fn assess(breakdown: &SeverityBreakdown) -> Self {
        let raw_score = weighted_score(breakdown);
        let level = classify(breakdown, raw_score);
        let narrative = level.narrative();
        Self {
            raw_score,
            score: raw_score.min(DISPLAY_CAP),
            level,
            legal_risk: narrative.legal_risk,
            reputation_risk: narrative.reputation_risk,
            recommendations: narrative.recommendations,
        }
    }
}

fn weighted_score(b: &SeverityBreakdown) -> usize {
    b.critical * CRITICAL_WEIGHT
        + b.serious * SERIOUS_WEIGHT
        + b.moderate * MODERATE_WEIGHT
        + b.minor * MINOR_WEIGHT
}

// First match wins.
fn classify(b: &SeverityBreakdown, score: usize) -> RiskLevel {
    if b.critical > 0 || score > 100 {
        RiskLevel::Critical
    } else if b.serious > 5 || score > 50 {
        RiskLevel::High
    } else if score > 20 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// India-specific regulatory classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComplianceStatus {
    /// Critical barriers present
    #[serde(rename = "Non-compliant")]
    NonCompliant,
    /// Some barriers present
    #[serde(rename = "Partially Compliant")]
    PartiallyCompliant,
    /// No significant automated findings
    Compliant,
}

impl ComplianceStatus {
    /// Classify a breakdown. Independent of the business risk score.
    #[must_use]
    pub fn classify(b: &SeverityBreakdown) -> Self {
        if b.critical > 0 {
            Self::NonCompliant
        } else if b.serious > 3 || b.total > 5 {
            Self::PartiallyCompliant
        } else {
            Self::Compliant
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonCompliant => "Non-compliant",
            Self::PartiallyCompliant => "Partially Compliant",
            Self::Compliant => "Compliant",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
