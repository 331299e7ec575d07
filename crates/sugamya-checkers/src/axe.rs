//! Structural rule checker backed by axe-core.

use crate::checker::Checker;
use crate::error::{CheckerError, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use sugamya_browser::PageSession;
use sugamya_core::{CheckerConfig, Issue, RuleViolation, Severity};

const NAME: &str = "axe";

/// Separator for selectors that cross shadow or frame boundaries.
const SELECTOR_JOIN: &str = " >>> ";

/// Runs the engine and reduces its output to what we persist.
const RUN_SCRIPT: &str = r"
(async () => {
  const results = await axe.run(document, { resultTypes: ['violations'] });
  return results.violations.map(v => ({
    id: v.id,
    impact: v.impact,
    description: v.description,
    help: v.help,
    helpUrl: v.helpUrl,
    nodes: v.nodes.map(n => ({ target: n.target, html: n.html })),
  }));
})()
";

/// Where the axe-core script comes from.
#[derive(Debug, Clone)]
pub enum AxeSource {
    /// Script text evaluated directly in the page
    Inline(Arc<str>),
    /// URL loaded through a `<script>` tag
    Url(String),
}

impl AxeSource {
    /// Read the script from a local file.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::Inline(source.into()))
    }

    fn injection_script(&self) -> String {
        match self {
            Self::Inline(source) => format!("{source}\n;true"),
            Self::Url(url) => format!(
                r"new Promise((resolve, reject) => {{
  if (window.axe) {{ resolve(true); return; }}
  const s = document.createElement('script');
  s.src = {url};
  s.onload = () => resolve(true);
  s.onerror = () => reject(new Error('axe-core failed to load'));
  document.head.appendChild(s);
}})",
                url = serde_json::Value::String(url.clone())
            ),
        }
    }
}

/// Issues plus the raw per-rule list kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxeFindings {
    /// One issue per violation-node pair
    pub issues: Vec<Issue>,
    /// One entry per violated rule
    pub violations: Vec<RuleViolation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawViolation {
    id: String,
    impact: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    help: String,
    help_url: Option<String>,
    #[serde(default)]
    nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    target: Vec<serde_json::Value>,
    html: Option<String>,
}

/// The axe-core rule checker.
#[derive(Debug, Clone)]
pub struct AxeChecker {
    source: AxeSource,
}

impl AxeChecker {
    /// Checker injecting axe-core from `source`.
    #[must_use]
    pub fn new(source: AxeSource) -> Self {
        Self { source }
    }

    /// Build from config: a local script when configured, otherwise the CDN.
    pub fn from_config(config: &CheckerConfig) -> std::io::Result<Self> {
        let source = match &config.axe_script_path {
            Some(path) => AxeSource::from_file(path)?,
            None => AxeSource::Url(config.axe_cdn_url.clone()),
        };
        Ok(Self::new(source))
    }
}

#[async_trait::async_trait]
impl Checker for AxeChecker {
    type Output = AxeFindings;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self, session: &dyn PageSession) -> Result<AxeFindings> {
        session
            .evaluate(&self.source.injection_script())
            .await
            .map_err(|e| CheckerError::from_browser(NAME, e))?;

        let raw = session
            .evaluate(RUN_SCRIPT)
            .await
            .map_err(|e| CheckerError::from_browser(NAME, e))?;

        let violations: Vec<RawViolation> =
            serde_json::from_value(raw).map_err(|e| CheckerError::Evaluation {
                checker: NAME,
                reason: format!("unexpected axe output: {e}"),
            })?;

        let findings = map_violations(violations);
        tracing::debug!(
            url = session.url(),
            rules = findings.violations.len(),
            issues = findings.issues.len(),
            "axe run complete"
        );
        Ok(findings)
    }
}

fn map_violations(violations: Vec<RawViolation>) -> AxeFindings {
    let mut findings = AxeFindings::default();

    for violation in violations {
        let severity = Severity::from_impact(violation.impact.as_deref());
        let description = if violation.help.is_empty() {
            violation.description.clone()
        } else {
            violation.help.clone()
        };

        for node in &violation.nodes {
            let mut issue = Issue::new(&violation.id, severity, &description);
            if let Some(selector) = node_selector(&node.target) {
                issue = issue.with_selector(selector);
            }
            if let Some(html) = node.html.as_deref().filter(|h| !h.is_empty()) {
                issue = issue.with_snippet(html);
            }
            findings.issues.push(issue);
        }

        findings.violations.push(RuleViolation {
            id: violation.id,
            impact: violation.impact,
            description: violation.description,
            help: violation.help,
            help_url: violation.help_url,
            node_count: violation.nodes.len(),
        });
    }

    findings
}

/// Flatten an axe target (strings, or nested arrays for shadow DOM) to one selector.
fn node_selector(target: &[serde_json::Value]) -> Option<String> {
    let parts: Vec<String> = target
        .iter()
        .filter_map(|part| match part {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(inner) => {
                let nested: Vec<&str> = inner.iter().filter_map(|v| v.as_str()).collect();
                (!nested.is_empty()).then(|| nested.join(SELECTOR_JOIN))
            }
            _ => None,
        })
        .collect();

    (!parts.is_empty()).then(|| parts.join(SELECTOR_JOIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::testing::ScriptedPage;
    use serde_json::json;
    use sugamya_browser::BrowserError;

    fn raw(value: serde_json::Value) -> Vec<RawViolation> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_every_violation_node_pair_is_an_issue() {
        let findings = map_violations(raw(json!([
            {
                "id": "image-alt",
                "impact": "critical",
                "description": "Ensures <img> elements have alternate text",
                "help": "Images must have alternate text",
                "helpUrl": "https://dequeuniversity.com/rules/axe/4.8/image-alt",
                "nodes": [
                    { "target": ["img.logo"], "html": "<img class=\"logo\">" },
                    { "target": ["#hero > img"], "html": "<img>" }
                ]
            },
            {
                "id": "color-contrast",
                "impact": "serious",
                "description": "Ensures contrast",
                "help": "Elements must have sufficient color contrast",
                "nodes": [{ "target": [".nav"], "html": "<a class=\"nav\">" }]
            }
        ])));

        assert_eq!(findings.issues.len(), 3);
        assert_eq!(findings.violations.len(), 2);
        assert_eq!(findings.issues[0].rule_id, "image-alt");
        assert_eq!(findings.issues[0].severity, Severity::Critical);
        assert_eq!(findings.issues[0].selector.as_deref(), Some("img.logo"));
        assert_eq!(findings.issues[0].description, "Images must have alternate text");
        assert_eq!(findings.issues[2].severity, Severity::Serious);
        assert_eq!(findings.violations[0].node_count, 2);
    }

    #[test]
    fn test_missing_impact_defaults_to_moderate() {
        let findings = map_violations(raw(json!([
            { "id": "region", "impact": null, "description": "d", "help": "", "nodes": [{ "target": ["main"] }] }
        ])));
        assert_eq!(findings.issues[0].severity, Severity::Moderate);
        assert_eq!(findings.issues[0].description, "d");
        assert!(findings.issues[0].snippet.is_none());
    }

    #[test]
    fn test_nested_targets_are_joined() {
        let selector = node_selector(&[json!(["my-widget", "button.close"])]);
        assert_eq!(selector.as_deref(), Some("my-widget >>> button.close"));
        assert_eq!(node_selector(&[]), None);
    }

    #[test]
    fn test_url_injection_quotes_the_url() {
        let script = AxeSource::Url("https://cdn.example/axe.min.js".into()).injection_script();
        assert!(script.contains("s.src = \"https://cdn.example/axe.min.js\""));
    }

    #[test]
    fn test_from_config_reads_local_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axe.min.js");
        std::fs::write(&path, "window.axe = {};").unwrap();

        let config = CheckerConfig {
            axe_script_path: Some(path),
            ..CheckerConfig::default()
        };
        let checker = AxeChecker::from_config(&config).unwrap();
        assert!(matches!(checker.source, AxeSource::Inline(_)));

        let missing = CheckerConfig {
            axe_script_path: Some(dir.path().join("nope.js")),
            ..CheckerConfig::default()
        };
        assert!(AxeChecker::from_config(&missing).is_err());
    }

    #[tokio::test]
    async fn test_run_against_scripted_page() {
        let page = ScriptedPage::new(|script| {
            if script.contains("axe.run") {
                Ok(json!([{ "id": "html-has-lang", "impact": "serious", "description": "d", "help": "h",
                            "nodes": [{ "target": ["html"], "html": "<html>" }] }]))
            } else {
                Ok(json!(true))
            }
        });
        let checker = AxeChecker::new(AxeSource::Inline("window.axe = {};".into()));

        let findings = checker.run(&page).await.unwrap();
        assert_eq!(findings.issues.len(), 1);
        assert_eq!(findings.issues[0].snippet.as_deref(), Some("<html>"));
    }

    #[tokio::test]
    async fn test_session_loss_surfaces_as_session_lost() {
        let page = ScriptedPage::new(|_| Err(BrowserError::SessionLost("Target closed".into())));
        let checker = AxeChecker::new(AxeSource::Url("https://cdn.example/axe.js".into()));

        let err = checker.run(&page).await.unwrap_err();
        assert!(matches!(err, CheckerError::SessionLost { checker: "axe", .. }));
    }

    #[tokio::test]
    async fn test_malformed_output_is_evaluation_error() {
        let page = ScriptedPage::new(|_| Ok(json!({ "unexpected": true })));
        let checker = AxeChecker::new(AxeSource::Inline("1".into()));

        let err = checker.run(&page).await.unwrap_err();
        assert_eq!(err.kind(), "evaluation");
    }
}
