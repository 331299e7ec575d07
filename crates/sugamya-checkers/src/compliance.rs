//! GIGW compliance-guideline checker.
//!
//! Eight fixed checks, each evaluated independently in the page. A check
//! whose evaluation errors is recorded as not evaluated and left out of the
//! tally; the remaining checks still run.

use crate::checker::Checker;
use crate::error::{CheckerError, Result};
use futures::future::join_all;
use serde::Deserialize;
use sugamya_browser::{BrowserError, PageSession};
use sugamya_core::{ComplianceResult, ComplianceViolation, Severity};

const NAME: &str = "compliance";

/// One guideline check.
#[derive(Debug, Clone, Copy)]
pub struct GuidelineCheck {
    /// Stable identifier, used as the violation's `rule`
    pub id: &'static str,
    /// Severity of a failure
    pub severity: Severity,
    /// Violation text when the check fails
    pub description: &'static str,
    script: &'static str,
}

/// The fixed GIGW check set. Every script resolves to `{ passed, detail }`.
pub const GUIDELINE_CHECKS: [GuidelineCheck; 8] = [
    GuidelineCheck {
        id: "text-alternatives",
        severity: Severity::Critical,
        description: "Images must carry a text alternative",
        script: r"(() => {
  const missing = [...document.querySelectorAll('img')].filter(img => !img.hasAttribute('alt'));
  return { passed: missing.length === 0, detail: missing.length + ' image(s) without alt' };
})()",
    },
    GuidelineCheck {
        id: "language-declaration",
        severity: Severity::Serious,
        description: "The page must declare its primary language",
        script: r"(() => {
  const lang = (document.documentElement.getAttribute('lang') || '').trim();
  return { passed: lang.length > 0, detail: lang || 'no lang attribute on <html>' };
})()",
    },
    GuidelineCheck {
        id: "form-labels",
        severity: Severity::Serious,
        description: "Form controls must have an associated label",
        script: r"(() => {
  const controls = [...document.querySelectorAll('input, select, textarea')]
    .filter(el => !['hidden', 'submit', 'button', 'reset', 'image'].includes((el.type || '').toLowerCase()));
  const unlabeled = controls.filter(el => {
    if (el.getAttribute('aria-label') || el.getAttribute('aria-labelledby') || el.getAttribute('title')) return false;
    if (el.closest('label')) return false;
    return !(el.id && document.querySelector('label[for=' + JSON.stringify(el.id) + ']'));
  });
  return { passed: unlabeled.length === 0, detail: unlabeled.length + ' unlabeled control(s)' };
})()",
    },
    GuidelineCheck {
        id: "auto-refresh",
        severity: Severity::Serious,
        description: "The page must not refresh or redirect automatically",
        script: r"(() => {
  const meta = document.querySelector('meta[http-equiv=refresh i]');
  return { passed: !meta, detail: meta ? meta.getAttribute('content') : 'none' };
})()",
    },
    GuidelineCheck {
        id: "skip-navigation",
        severity: Severity::Moderate,
        description: "A skip-to-content link must be available",
        script: r"(() => {
  const links = [...document.querySelectorAll('a[href^=\x22#\x22]')];
  const skip = links.find(a => /skip|jump|main content/i.test(a.textContent || a.getAttribute('aria-label') || ''));
  return { passed: !!skip, detail: skip ? skip.getAttribute('href') : 'no skip link' };
})()",
    },
    GuidelineCheck {
        id: "keyboard-access",
        severity: Severity::Serious,
        description: "Interactive elements must be reachable by keyboard",
        script: r"(() => {
  const handlers = [...document.querySelectorAll('[onclick]')].filter(el => {
    const tag = el.tagName.toLowerCase();
    if (['a', 'button', 'input', 'select', 'textarea', 'summary'].includes(tag)) return false;
    return !el.hasAttribute('tabindex');
  });
  const trapped = [...document.querySelectorAll('[tabindex]')]
    .filter(el => parseInt(el.getAttribute('tabindex'), 10) > 0);
  return {
    passed: handlers.length === 0 && trapped.length === 0,
    detail: handlers.length + ' non-focusable click target(s), ' + trapped.length + ' positive tabindex',
  };
})()",
    },
    GuidelineCheck {
        id: "page-title",
        severity: Severity::Moderate,
        description: "The page must have a descriptive title",
        script: r"(() => {
  const title = (document.title || '').trim();
  return { passed: title.length > 0, detail: title || 'empty <title>' };
})()",
    },
    GuidelineCheck {
        id: "focus-indicators",
        severity: Severity::Serious,
        description: "Focused elements must show a visible focus indicator",
        script: FOCUS_INDICATOR_SCRIPT,
    },
];

/// Flags `:focus` rules that remove the outline without a replacement
/// (box-shadow or border). Cross-origin sheets cannot be read and are skipped.
const FOCUS_INDICATOR_SCRIPT: &str = r"(() => {
  const offending = [];
  const visit = rules => {
    for (const rule of rules) {
      if (rule.cssRules) { visit(rule.cssRules); continue; }
      if (!rule.selectorText || !/:focus/.test(rule.selectorText)) continue;
      const s = rule.style;
      const outline = (s.outlineStyle || s.outline || '').trim();
      const removed = outline === 'none' || outline === '0' || s.outlineWidth === '0px' || s.outlineWidth === '0';
      const replaced = (s.boxShadow && s.boxShadow !== 'none') || (s.borderStyle && s.borderStyle !== 'none') || !!s.textDecoration;
      if (removed && !replaced) offending.push(rule.selectorText);
    }
  };
  for (const sheet of document.styleSheets) {
    let rules;
    try { rules = sheet.cssRules; } catch (e) { continue; }
    if (rules) visit(rules);
  }
  return { passed: offending.length === 0, detail: offending.slice(0, 5).join(', ') || 'none' };
})()";

#[derive(Debug, Deserialize)]
struct CheckVerdict {
    passed: bool,
    #[serde(default)]
    detail: Option<String>,
}

/// How a single guideline check came out.
#[derive(Debug)]
enum CheckResult {
    Passed,
    Failed(ComplianceViolation),
    NotEvaluated { lost: bool },
}

/// Runs the fixed GIGW check set.
#[derive(Debug, Clone, Default)]
pub struct ComplianceChecker;

impl ComplianceChecker {
    /// The eight-check GIGW set.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn run_check(session: &dyn PageSession, check: &GuidelineCheck) -> CheckResult {
    let value = match session.evaluate(check.script).await {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(check = check.id, "Compliance check not evaluated: {}", err);
            return CheckResult::NotEvaluated {
                lost: matches!(err, BrowserError::SessionLost(_)),
            };
        }
    };

    match serde_json::from_value::<CheckVerdict>(value) {
        Ok(verdict) if verdict.passed => CheckResult::Passed,
        Ok(verdict) => {
            let description = match verdict.detail.filter(|d| !d.is_empty()) {
                Some(detail) => format!("{} ({detail})", check.description),
                None => check.description.to_string(),
            };
            CheckResult::Failed(ComplianceViolation {
                rule: check.id.to_string(),
                description,
                severity: check.severity,
            })
        }
        Err(e) => {
            tracing::debug!(check = check.id, "Compliance check returned garbage: {}", e);
            CheckResult::NotEvaluated { lost: false }
        }
    }
}

/// Fold per-check results into the final result.
fn tally(results: Vec<(&'static str, CheckResult)>) -> Result<ComplianceResult> {
    let total = results.len();
    let mut passed_checks = 0u32;
    let mut violations = Vec::new();
    let mut not_evaluated = Vec::new();
    let mut any_lost = false;

    for (id, result) in results {
        match result {
            CheckResult::Passed => passed_checks += 1,
            CheckResult::Failed(violation) => violations.push(violation),
            CheckResult::NotEvaluated { lost } => {
                any_lost |= lost;
                not_evaluated.push(id.to_string());
            }
        }
    }

    // Nothing evaluated must not read as a pass.
    if total > 0 && not_evaluated.len() == total {
        let reason = "no guideline check could be evaluated".to_string();
        return Err(if any_lost {
            CheckerError::SessionLost {
                checker: NAME,
                reason,
            }
        } else {
            CheckerError::Evaluation {
                checker: NAME,
                reason,
            }
        });
    }

    Ok(ComplianceResult {
        passed: violations.is_empty(),
        total_checks: u32::try_from(total).unwrap_or(u32::MAX),
        passed_checks,
        violations,
        not_evaluated,
    })
}

#[async_trait::async_trait]
impl Checker for ComplianceChecker {
    type Output = ComplianceResult;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self, session: &dyn PageSession) -> Result<ComplianceResult> {
        let results = join_all(GUIDELINE_CHECKS.iter().map(|check| async move {
            (check.id, run_check(session, check).await)
        }))
        .await;

        let result = tally(results)?;
        tracing::debug!(
            url = session.url(),
            passed = result.passed,
            passed_checks = result.passed_checks,
            not_evaluated = result.not_evaluated.len(),
            "Compliance checks complete"
        );
        Ok(result)
    }
}
