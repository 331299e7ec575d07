//! WCAG annotation and conformance.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use sugamya_core::Issue;
use Principle::{Operable, Perceivable, Robust, Understandable};
use WcagLevel::{A, AA, AAA};

/// WCAG principle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Principle {
    /// 1. Perceivable
    Perceivable,
    /// 2. Operable
    Operable,
    /// 3. Understandable
    Understandable,
    /// 4. Robust
    Robust,
}

impl Principle {
    /// All principles in WCAG order.
    pub const ALL: [Principle; 4] = [
        Self::Perceivable,
        Self::Operable,
        Self::Understandable,
        Self::Robust,
    ];
}

/// Success criterion level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum WcagLevel {
    /// Level A
    A,
    /// Level AA
    AA,
    /// Level AAA
    AAA,
}

/// Where a rule sits in WCAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WcagMapping {
    /// Principle
    pub principle: Principle,
    /// Guideline number, e.g. `1.1`
    pub guideline: &'static str,
    /// Success criterion, e.g. `1.1.1`
    pub criterion: &'static str,
    /// Level of the criterion
    pub level: WcagLevel,
}

const fn map(
    principle: Principle,
    guideline: &'static str,
    criterion: &'static str,
    level: WcagLevel,
) -> WcagMapping {
    WcagMapping {
        principle,
        guideline,
        criterion,
        level,
    }
}

/// Category for rule ids missing from the table.
pub const DEFAULT_MAPPING: WcagMapping = map(Robust, "4.1", "4.1.1", A);

/// Rule id to WCAG mapping.
static RULE_MAP: &[(&str, WcagMapping)] = &[
    ("image-alt", map(Perceivable, "1.1", "1.1.1", A)),
    ("input-image-alt", map(Perceivable, "1.1", "1.1.1", A)),
    ("area-alt", map(Perceivable, "1.1", "1.1.1", A)),
    ("object-alt", map(Perceivable, "1.1", "1.1.1", A)),
    ("svg-img-alt", map(Perceivable, "1.1", "1.1.1", A)),
    ("role-img-alt", map(Perceivable, "1.1", "1.1.1", A)),
    ("video-caption", map(Perceivable, "1.2", "1.2.2", A)),
    ("audio-caption", map(Perceivable, "1.2", "1.2.1", A)),
    ("definition-list", map(Perceivable, "1.3", "1.3.1", A)),
    ("dlitem", map(Perceivable, "1.3", "1.3.1", A)),
    ("list", map(Perceivable, "1.3", "1.3.1", A)),
    ("listitem", map(Perceivable, "1.3", "1.3.1", A)),
    ("th-has-data-cells", map(Perceivable, "1.3", "1.3.1", A)),
    ("td-headers-attr", map(Perceivable, "1.3", "1.3.1", A)),
    ("heading-order", map(Perceivable, "1.3", "1.3.1", A)),
    ("autocomplete-valid", map(Perceivable, "1.3", "1.3.5", AA)),
    ("color-contrast", map(Perceivable, "1.4", "1.4.3", AA)),
    ("color-contrast-enhanced", map(Perceivable, "1.4", "1.4.6", AAA)),
    ("link-in-text-block", map(Perceivable, "1.4", "1.4.1", A)),
    ("meta-viewport", map(Perceivable, "1.4", "1.4.4", AA)),
    ("meta-viewport-large", map(Perceivable, "1.4", "1.4.4", AA)),
    ("avoid-inline-spacing", map(Perceivable, "1.4", "1.4.12", AA)),
    ("accesskeys", map(Operable, "2.1", "2.1.1", A)),
    ("scrollable-region-focusable", map(Operable, "2.1", "2.1.1", A)),
    ("meta-refresh", map(Operable, "2.2", "2.2.1", A)),
    ("blink", map(Operable, "2.2", "2.2.2", A)),
    ("marquee", map(Operable, "2.2", "2.2.2", A)),
    ("bypass", map(Operable, "2.4", "2.4.1", A)),
    ("skip-link", map(Operable, "2.4", "2.4.1", A)),
    ("document-title", map(Operable, "2.4", "2.4.2", A)),
    ("tabindex", map(Operable, "2.4", "2.4.3", A)),
    ("link-name", map(Operable, "2.4", "2.4.4", A)),
    ("frame-title", map(Robust, "4.1", "4.1.2", A)),
    ("html-has-lang", map(Understandable, "3.1", "3.1.1", A)),
    ("html-lang-valid", map(Understandable, "3.1", "3.1.1", A)),
    ("valid-lang", map(Understandable, "3.1", "3.1.2", AA)),
    ("label", map(Understandable, "3.3", "3.3.2", A)),
    ("select-name", map(Understandable, "3.3", "3.3.2", A)),
    ("form-field-multiple-labels", map(Understandable, "3.3", "3.3.2", A)),
    ("duplicate-id", map(Robust, "4.1", "4.1.1", A)),
    ("duplicate-id-active", map(Robust, "4.1", "4.1.1", A)),
    ("duplicate-id-aria", map(Robust, "4.1", "4.1.1", A)),
    ("button-name", map(Robust, "4.1", "4.1.2", A)),
    ("input-button-name", map(Robust, "4.1", "4.1.2", A)),
    ("aria-allowed-attr", map(Robust, "4.1", "4.1.2", A)),
    ("aria-required-attr", map(Robust, "4.1", "4.1.2", A)),
    ("aria-required-children", map(Robust, "4.1", "4.1.2", A)),
    ("aria-required-parent", map(Robust, "4.1", "4.1.2", A)),
    ("aria-roles", map(Robust, "4.1", "4.1.2", A)),
    ("aria-valid-attr", map(Robust, "4.1", "4.1.2", A)),
    ("aria-valid-attr-value", map(Robust, "4.1", "4.1.2", A)),
    ("aria-hidden-focus", map(Robust, "4.1", "4.1.2", A)),
    ("nested-interactive", map(Robust, "4.1", "4.1.2", A)),
];

impl WcagMapping {
    /// Look up a rule id, falling back to [`DEFAULT_MAPPING`].
    #[must_use]
    pub fn for_rule(rule_id: &str) -> Self {
        RULE_MAP
            .iter()
            .find(|(id, _)| *id == rule_id)
            .map_or(DEFAULT_MAPPING, |(_, mapping)| *mapping)
    }
}

/// An issue annotated with its WCAG category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WcagIssue {
    /// The finding
    #[serde(flatten)]
    pub issue: Issue,
    /// Its WCAG category
    pub wcag: WcagMapping,
}

/// Annotate every issue.
#[must_use]
pub fn categorize(issues: &[Issue]) -> Vec<WcagIssue> {
    issues
        .iter()
        .map(|issue| WcagIssue {
            wcag: WcagMapping::for_rule(&issue.rule_id),
            issue: issue.clone(),
        })
        .collect()
}

/// Issues and failed criteria for one principle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipleSummary {
    /// Principle
    pub principle: Principle,
    /// Issues mapped to it
    pub issue_count: usize,
    /// Distinct failed success criteria, sorted
    pub failed_criteria: Vec<&'static str>,
}

/// Summarise annotated issues per principle, in WCAG order.
#[must_use]
pub fn summarize_principles(issues: &[WcagIssue]) -> Vec<PrincipleSummary> {
    Principle::ALL
        .iter()
        .map(|&principle| {
            let matching = issues.iter().filter(|i| i.wcag.principle == principle);
            let criteria: BTreeSet<&'static str> =
                matching.clone().map(|i| i.wcag.criterion).collect();
            PrincipleSummary {
                principle,
                issue_count: matching.count(),
                failed_criteria: criteria.into_iter().collect(),
            }
        })
        .collect()
}

/// Level of conformance claimed by the automated findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConformanceLevel {
    /// At least one Level A criterion fails
    #[serde(rename = "Non-conformant")]
    NonConformant,
    /// Level A met, some AA fails
    A,
    /// A and AA met, some AAA fails
    AA,
    /// Nothing fails
    AAA,
}

impl ConformanceLevel {
    /// Derive from annotated issues.
    #[must_use]
    pub fn derive(issues: &[WcagIssue]) -> Self {
        let failed = |level: WcagLevel| issues.iter().any(|i| i.wcag.level == level);
        if failed(WcagLevel::A) {
            Self::NonConformant
        } else if failed(WcagLevel::AA) {
            Self::A
        } else if issues.is_empty() {
            Self::AAA
        } else {
            Self::AA
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonConformant => "Non-conformant",
            Self::A => "A",
            Self::AA => "AA",
            Self::AAA => "AAA",
        }
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
