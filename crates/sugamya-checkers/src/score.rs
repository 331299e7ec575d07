//! Accessibility score from an independent engine.
//!
//! The engine runs in its own OS process with its own browser, so nothing it
//! does can disturb the page session the other checkers share.

use crate::checker::Checker;
use crate::error::{CheckerError, Result};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use sugamya_browser::PageSession;
use sugamya_core::CheckerConfig;
use tokio::process::Command;

const NAME: &str = "score";

/// Produces a 0-100 accessibility score for a URL.
#[async_trait::async_trait]
pub trait ScoreEngine: Send + Sync {
    /// Score `url`.
    async fn score(&self, url: &str) -> Result<u8>;
}

/// Runs the `lighthouse` CLI restricted to the accessibility category.
#[derive(Debug, Clone)]
pub struct LighthouseEngine {
    binary: String,
    timeout: Duration,
    chrome_flags: String,
}

impl LighthouseEngine {
    /// Run `binary` with a hard `timeout` per URL.
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            chrome_flags: "--headless=new --no-sandbox --disable-gpu".to_string(),
        }
    }

    /// Binary and timeout from config.
    #[must_use]
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self::new(
            config.lighthouse_binary.clone(),
            Duration::from_secs(config.score_timeout_secs),
        )
    }

    fn args(&self, url: &str) -> Vec<String> {
        vec![
            url.to_string(),
            "--quiet".to_string(),
            "--output=json".to_string(),
            "--output-path=stdout".to_string(),
            "--only-categories=accessibility".to_string(),
            format!("--chrome-flags={}", self.chrome_flags),
        ]
    }
}

#[async_trait::async_trait]
impl ScoreEngine for LighthouseEngine {
    async fn score(&self, url: &str) -> Result<u8> {
        let child = Command::new(&self.binary)
            .args(self.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CheckerError::ScoreEngineUnavailable(format!("cannot start {}: {e}", self.binary))
            })?;

        // Dropping the child on timeout kills the process.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                CheckerError::ScoreEngineUnavailable(format!(
                    "no result within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| CheckerError::ScoreEngineUnavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(CheckerError::ScoreEngineUnavailable(format!(
                "exited with {}: {}",
                output.status,
                line.trim()
            )));
        }

        parse_lighthouse_score(&output.stdout)
    }
}

/// Read `categories.accessibility.score` (0.0-1.0) as a 0-100 integer.
///
/// A report carrying a top-level `runtimeError` means Lighthouse could not
/// load or audit the page, which is an engine failure rather than a bad
/// report.
pub fn parse_lighthouse_score(report: &[u8]) -> Result<u8> {
    let evaluation = |reason: String| CheckerError::Evaluation {
        checker: NAME,
        reason,
    };

    let value: serde_json::Value = serde_json::from_slice(report)
        .map_err(|e| evaluation(format!("unreadable report: {e}")))?;

    if let Some(runtime_error) = value.get("runtimeError").filter(|v| !v.is_null()) {
        let code = runtime_error
            .get("code")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("UNKNOWN");
        let message = runtime_error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("no message");
        return Err(CheckerError::ScoreEngineUnavailable(format!(
            "lighthouse runtime error {code}: {message}"
        )));
    }

    let score = value
        .pointer("/categories/accessibility/score")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| evaluation("report has no accessibility score".to_string()))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (score * 100.0).round().clamp(0.0, 100.0) as u8;
    Ok(scaled)
}

/// Checker wrapper that scores the session's URL with an independent engine.
#[derive(Clone)]
pub struct ScoreChecker {
    engine: Arc<dyn ScoreEngine>,
}

impl ScoreChecker {
    /// Wrap a score engine.
    #[must_use]
    pub fn new(engine: Arc<dyn ScoreEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl Checker for ScoreChecker {
    type Output = u8;

    fn name(&self) -> &'static str {
        NAME
    }

    fn uses_session(&self) -> bool {
        false
    }

    async fn run(&self, session: &dyn PageSession) -> Result<u8> {
        let score = self.engine.score(session.url()).await?;
        tracing::debug!(url = session.url(), score, "Score engine finished");
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{testing::ScriptedPage, CheckerOutcome};

    struct FixedEngine(Option<u8>);

    #[async_trait::async_trait]
    impl ScoreEngine for FixedEngine {
        async fn score(&self, _url: &str) -> Result<u8> {
            self.0
                .ok_or_else(|| CheckerError::ScoreEngineUnavailable("ECONNREFUSED".into()))
        }
    }

    #[test]
    fn test_parse_score() {
        let report = br#"{"categories":{"accessibility":{"score":0.876}}}"#;
        assert_eq!(parse_lighthouse_score(report).unwrap(), 88);

        let perfect = br#"{"categories":{"accessibility":{"score":1}}}"#;
        assert_eq!(parse_lighthouse_score(perfect).unwrap(), 100);
    }

    #[test]
    fn test_parse_score_null_or_garbage() {
        let null = br#"{"categories":{"accessibility":{"score":null}}}"#;
        assert_eq!(parse_lighthouse_score(null).unwrap_err().kind(), "evaluation");
        assert_eq!(parse_lighthouse_score(b"not json").unwrap_err().kind(), "evaluation");
    }

    #[test]
    fn test_runtime_error_is_engine_unavailable() {
        let report = br#"{
            "runtimeError": {
                "code": "ERRORED_DOCUMENT_REQUEST",
                "message": "Lighthouse was unable to reliably load the page you requested."
            },
            "categories": {"accessibility": {"score": null}}
        }"#;
        let err = parse_lighthouse_score(report).unwrap_err();
        assert_eq!(err.kind(), "score_engine_unavailable");
        assert!(err.to_string().contains("ERRORED_DOCUMENT_REQUEST"));
    }

    #[test]
    fn test_args_restrict_category() {
        let engine = LighthouseEngine::from_config(&CheckerConfig::default());
        let args = engine.args("https://example.gov.in");
        assert_eq!(args[0], "https://example.gov.in");
        assert!(args.contains(&"--only-categories=accessibility".to_string()));
        assert!(args.contains(&"--output-path=stdout".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let engine = LighthouseEngine::new("sugamya-no-such-lighthouse", Duration::from_secs(5));
        let err = engine.score("https://example.com").await.unwrap_err();
        assert_eq!(err.kind(), "score_engine_unavailable");
    }

    #[tokio::test]
    async fn test_score_runs_on_lost_session() {
        let page = ScriptedPage::lost();
        let checker = ScoreChecker::new(Arc::new(FixedEngine(Some(91))));
        let outcome = CheckerOutcome::settle(&checker, &page).await;
        assert_eq!(outcome.into_output(), Some(91));
    }

    #[tokio::test]
    async fn test_engine_failure_is_distinct() {
        let page = ScriptedPage::new(|_| Ok(serde_json::Value::Null));
        let checker = ScoreChecker::new(Arc::new(FixedEngine(None)));
        let outcome = CheckerOutcome::settle(&checker, &page).await;
        assert_eq!(
            outcome.error().map(CheckerError::kind),
            Some("score_engine_unavailable")
        );
    }

    #[tokio::test]
    #[ignore = "Requires lighthouse CLI and Chrome - run with --ignored"]
    async fn test_lighthouse_real_site() {
        let engine = LighthouseEngine::new("lighthouse", Duration::from_secs(180));
        let score = engine.score("https://example.com").await.unwrap();
        assert!(score <= 100);
    }
}
