//! Scan orchestrator: drives one scan job end-to-end.
//!
//! `run` acquires a page session, settles every checker against it
//! concurrently, releases the session, and persists the outcome. Nothing
//! escapes `run`; errors are classified and stored on the scan record.

use crate::coordinator::ScanCoordinator;
use crate::error::{Result, ScanError};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use sugamya_browser::{BrowserError, NavigationProfile, PageSession, SessionProvider};
use sugamya_checkers::{
    AxeChecker, AxeFindings, Checker, CheckerOutcome, ComplianceChecker, LighthouseEngine,
    ScoreChecker,
};
use sugamya_core::{
    CheckerConfig, CheckerFailure, ComplianceResult, Diagnostics, Issue, ScanId, ScanJob,
    ScanStatus,
};
use sugamya_db::ScanStore;
use tracing::Instrument;

/// The three checkers run against every page.
#[derive(Clone)]
pub struct CheckerSet {
    rules: Arc<dyn Checker<Output = AxeFindings>>,
    compliance: Arc<dyn Checker<Output = ComplianceResult>>,
    score: Arc<dyn Checker<Output = u8>>,
}

/// Everything the checkers produced for one page, ready to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettledScan {
    /// Issues from the rule checker, empty when it did not succeed
    pub issues: Vec<Issue>,
    /// Score, absent when the score checker did not succeed
    pub score: Option<u8>,
    /// Compliance result, raw violations and checker errors
    pub diagnostics: Diagnostics,
    /// The page was lost and no checker that needs it produced a result
    pub page_lost: bool,
}

impl CheckerSet {
    /// Assemble a checker set from explicit checkers.
    pub fn new(
        rules: Arc<dyn Checker<Output = AxeFindings>>,
        compliance: Arc<dyn Checker<Output = ComplianceResult>>,
        score: Arc<dyn Checker<Output = u8>>,
    ) -> Self {
        Self {
            rules,
            compliance,
            score,
        }
    }

    /// axe-core, the GIGW checks and Lighthouse, configured from `config`.
    pub fn from_config(config: &CheckerConfig) -> std::io::Result<Self> {
        Ok(Self::new(
            Arc::new(AxeChecker::from_config(config)?),
            Arc::new(ComplianceChecker::new()),
            Arc::new(ScoreChecker::new(Arc::new(LighthouseEngine::from_config(config)))),
        ))
    }

    /// Run all checkers concurrently and wait until every one has settled.
    pub async fn run_all(&self, session: &dyn PageSession) -> SettledScan {
        let (rules, compliance, score) = tokio::join!(
            CheckerOutcome::settle(self.rules.as_ref(), session),
            CheckerOutcome::settle(self.compliance.as_ref(), session),
            CheckerOutcome::settle(self.score.as_ref(), session),
        );

        let mut diagnostics = Diagnostics::default();
        note_outcome(&mut diagnostics, self.rules.name(), &rules);
        note_outcome(&mut diagnostics, self.compliance.name(), &compliance);
        note_outcome(&mut diagnostics, self.score.name(), &score);

        let rules_succeeded = rules.is_succeeded();
        let issues = match rules.into_output() {
            Some(findings) => {
                diagnostics.rule_violations = Some(findings.violations);
                findings.issues
            }
            None => Vec::new(),
        };
        let page_lost = session.is_lost()
            && !(self.rules.uses_session() && rules_succeeded)
            && !(self.compliance.uses_session() && compliance.is_succeeded())
            && (self.rules.uses_session() || self.compliance.uses_session());
        diagnostics.compliance = compliance.into_output();

        SettledScan {
            issues,
            score: score.into_output(),
            diagnostics,
            page_lost,
        }
    }
}

fn note_outcome<T>(diagnostics: &mut Diagnostics, checker: &str, outcome: &CheckerOutcome<T>) {
    if let Some(err) = outcome.error() {
        diagnostics.checker_errors.push(CheckerFailure {
            checker: checker.to_string(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    } else if outcome.is_skipped() {
        diagnostics.skipped_checkers.push(checker.to_string());
    }
}

/// Status a batch parent should move to given its children.
///
/// Completes once every page completed. When every page has settled but some
/// failed, the parent completes if at least one page succeeded and fails
/// otherwise.
#[must_use]
pub fn parent_status(
    total_pages: u32,
    completed: u32,
    children: usize,
    settled: usize,
) -> ScanStatus {
    if completed >= total_pages {
        return ScanStatus::Completed;
    }
    let all_created = u32::try_from(children).map_or(true, |n| n >= total_pages);
    if all_created && settled == children {
        if completed > 0 {
            ScanStatus::Completed
        } else {
            ScanStatus::Failed
        }
    } else {
        ScanStatus::Processing
    }
}

/// Drives scan jobs through session, checkers and persistence.
pub struct ScanOrchestrator {
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn ScanStore>,
    checkers: CheckerSet,
    coordinator: Arc<ScanCoordinator>,
}

impl ScanOrchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn ScanStore>,
        checkers: CheckerSet,
        coordinator: Arc<ScanCoordinator>,
    ) -> Self {
        Self {
            sessions,
            store,
            checkers,
            coordinator,
        }
    }

    /// The admission coordinator consulted before each job starts.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<ScanCoordinator> {
        &self.coordinator
    }

    /// Run one job to a terminal state. Never fails and never panics out.
    pub async fn run(&self, job: ScanJob) {
        let span = tracing::info_span!("scan", scan_id = %job.scan_id, url = %job.target_url);
        async {
            if self.coordinator.is_draining() {
                self.fail(&job.scan_id, &ScanError::ShutdownInProgress).await;
            } else {
                match AssertUnwindSafe(self.execute(&job)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => self.fail(&job.scan_id, &err).await,
                    Err(_) => {
                        let err = ScanError::Unknown("scan task panicked".to_string());
                        self.fail(&job.scan_id, &err).await;
                    }
                }
            }

            if let Some(parent_id) = &job.parent_scan_id {
                if let Err(e) = self.rollup_parent(parent_id).await {
                    tracing::error!(parent_id = %parent_id, "Batch rollup failed: {}", e);
                }
            }
        }
        .instrument(span)
        .await;
    }

    async fn execute(&self, job: &ScanJob) -> Result<()> {
        let started = self
            .store
            .update_scan_status(&job.scan_id, ScanStatus::Processing, None, None)
            .await?;
        if !started {
            tracing::warn!("Scan is no longer queued, skipping");
            return Ok(());
        }

        let profile = if job.is_batch_child() {
            NavigationProfile::Batch
        } else {
            NavigationProfile::Single
        };
        let session = self
            .sessions
            .acquire(&job.target_url, profile)
            .await
            .map_err(ScanError::Acquisition)?;

        let settled = AssertUnwindSafe(self.checkers.run_all(session.as_ref()))
            .catch_unwind()
            .await;
        self.sessions.release(session).await;
        let settled =
            settled.map_err(|_| ScanError::Unknown("checker fan-out panicked".to_string()))?;
        if settled.page_lost {
            return Err(ScanError::Browser(BrowserError::SessionLost(
                "page closed before any page checker produced a result".to_string(),
            )));
        }

        let completed = self
            .store
            .complete_scan(&job.scan_id, &settled.issues, settled.score, &settled.diagnostics)
            .await?;
        if completed {
            tracing::info!(
                issues = settled.issues.len(),
                score = ?settled.score,
                checker_errors = settled.diagnostics.checker_errors.len(),
                "Scan completed"
            );
        } else {
            tracing::warn!("Scan left processing before results were stored");
        }
        Ok(())
    }

    async fn fail(&self, scan_id: &ScanId, err: &ScanError) {
        let reason = err.failure_reason();
        if matches!(err, ScanError::ShutdownInProgress) {
            tracing::warn!(reason = %reason, "Scan rejected: {}", err);
        } else {
            tracing::error!(reason = %reason, "Scan failed: {}", err);
        }

        let diagnostics = Diagnostics::failed(reason, err.to_string());
        match self
            .store
            .update_scan_status(scan_id, ScanStatus::Failed, None, Some(&diagnostics))
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Scan already terminal, failure not recorded"),
            Err(e) => tracing::error!("Could not record scan failure: {}", e),
        }
    }

    /// Recompute a batch parent's progress and status from its children.
    pub async fn rollup_parent(&self, parent_id: &ScanId) -> Result<()> {
        let parent = self.store.get_scan(parent_id).await?;
        let children = self.store.get_child_scans(parent_id).await?;

        let completed = children
            .iter()
            .filter(|c| c.status == ScanStatus::Completed)
            .count();
        let settled = children.iter().filter(|c| c.status.is_terminal()).count();
        let completed = u32::try_from(completed).unwrap_or(u32::MAX);
        let status = parent_status(parent.total_pages, completed, children.len(), settled);

        let applied = self
            .store
            .update_parent_progress(parent_id, completed, status)
            .await?;
        tracing::debug!(
            parent_id = %parent_id,
            completed,
            total = parent.total_pages,
            status = %status,
            applied,
            "Batch progress"
        );
        Ok(())
    }
}
