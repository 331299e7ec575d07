//! Grouping and severity breakdown.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use sugamya_core::{Issue, Severity};

/// All occurrences of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedIssue {
    /// Rule identifier
    pub rule_id: String,
    /// Worst severity seen for the rule
    pub severity: Severity,
    /// Description of the first occurrence
    pub description: String,
    /// Number of occurrences
    pub count: usize,
    /// Every selector seen, in order; not deduplicated
    pub selectors: Vec<String>,
}

/// Group issues by rule id.
///
/// Groups are ordered by severity rank (critical first), then by count
/// descending. The sort is stable, so ties keep first-seen order.
pub fn group_issues(issues: &[Issue]) -> Vec<GroupedIssue> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupedIssue> = Vec::new();

    for issue in issues {
        let slot = *index.entry(issue.rule_id.as_str()).or_insert_with(|| {
            groups.push(GroupedIssue {
                rule_id: issue.rule_id.clone(),
                severity: issue.severity,
                description: issue.description.clone(),
                count: 0,
                selectors: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.count += 1;
        if issue.severity.rank() < group.severity.rank() {
            group.severity = issue.severity;
        }
        if let Some(selector) = &issue.selector {
            group.selectors.push(selector.clone());
        }
    }

    groups.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| b.count.cmp(&a.count))
    });
    groups
}

/// Per-severity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    /// Critical issues
    pub critical: usize,
    /// Serious issues
    pub serious: usize,
    /// Moderate issues
    pub moderate: usize,
    /// Minor issues
    pub minor: usize,
    /// All issues
    pub total: usize,
}

impl SeverityBreakdown {
    /// Count issues by severity.
    #[must_use]
    pub fn from_issues(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut acc, issue| {
            match issue.severity {
                Severity::Critical => acc.critical += 1,
                Severity::Serious => acc.serious += 1,
                Severity::Moderate => acc.moderate += 1,
                Severity::Minor => acc.minor += 1,
            }
            acc.total += 1;
            acc
        })
    }

    /// Build from explicit counts; `total` is their sum.
    #[must_use]
    pub fn new(critical: usize, serious: usize, moderate: usize, minor: usize) -> Self {
        Self {
            critical,
            serious,
            moderate,
            minor,
            total: critical + serious + moderate + minor,
        }
    }

    /// Count for one severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Serious => self.serious,
            Severity::Moderate => self.moderate,
            Severity::Minor => self.minor,
        }
    }
}
