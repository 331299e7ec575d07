//! Fakes shared by the scanner integration tests.

#![allow(dead_code)]

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sugamya_browser::{BrowserError, NavigationProfile, PageSession, SessionProvider};
use sugamya_checkers::{AxeFindings, Checker, CheckerError};
use sugamya_core::{
    ComplianceResult, Issue, NewScan, RuleViolation, ScanJob, ScanRecord, Severity,
};
use sugamya_db::{Database, ScanStore};
use sugamya_discovery::UrlDiscovery;
use sugamya_scanner::{CheckerSet, ScanCoordinator, ScanOrchestrator};
use tokio::sync::Semaphore;

pub async fn setup_db() -> Database {
    let db = Database::new(":memory:").await.expect("create database");
    db.run_migrations().await.expect("run migrations");
    db
}

pub async fn queued_scan(db: &Database, url: &str) -> ScanRecord {
    db.create_scan(NewScan::single("site-1", url))
        .await
        .expect("create scan")
}

pub fn job_for(record: &ScanRecord) -> ScanJob {
    ScanJob {
        scan_id: record.id.clone(),
        website_id: record.website_id.clone(),
        target_url: record.url.clone(),
        parent_scan_id: record.parent_scan_id.clone(),
    }
}

pub struct FakePage {
    url: String,
    lost: AtomicBool,
}

#[async_trait::async_trait]
impl PageSession for FakePage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn evaluate(&self, _script: &str) -> sugamya_browser::Result<Value> {
        Ok(Value::Null)
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    async fn close(&mut self) {}
}

type AcquireFailure = Box<dyn Fn(&str) -> BrowserError + Send + Sync>;

/// Session provider that counts acquisitions and releases.
#[derive(Default)]
pub struct FakeSessions {
    pub acquire_calls: AtomicUsize,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub released_lost: AtomicUsize,
    fail_with: Option<AcquireFailure>,
    lost_on_arrival: bool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeSessions {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing(fail: impl Fn(&str) -> BrowserError + Send + Sync + 'static) -> Self {
        Self {
            fail_with: Some(Box::new(fail)),
            ..Self::default()
        }
    }

    pub fn lost_on_arrival() -> Self {
        Self {
            lost_on_arrival: true,
            ..Self::default()
        }
    }

    /// Acquisitions block until the returned semaphore gets permits.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let sessions = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (sessions, gate)
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Releases of a session that had been marked lost.
    pub fn released_lost(&self) -> usize {
        self.released_lost.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionProvider for FakeSessions {
    async fn acquire(
        &self,
        url: &str,
        _profile: NavigationProfile,
    ) -> sugamya_browser::Result<Box<dyn PageSession>> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
        if let Some(fail) = &self.fail_with {
            return Err(fail(url));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            url: url.to_string(),
            lost: AtomicBool::new(self.lost_on_arrival),
        }))
    }

    async fn release(&self, mut session: Box<dyn PageSession>) {
        self.released.fetch_add(1, Ordering::SeqCst);
        if session.is_lost() {
            self.released_lost.fetch_add(1, Ordering::SeqCst);
        }
        session.close().await;
    }
}

/// What a stub checker does when run.
#[derive(Clone)]
pub enum Behavior<T> {
    Return(T),
    FailEvaluation,
    EngineUnavailable,
    LoseSession,
    Panic,
}

pub struct StubChecker<T> {
    name: &'static str,
    uses_session: bool,
    behavior: Behavior<T>,
    delay: Duration,
}

impl<T> StubChecker<T> {
    pub fn new(name: &'static str, behavior: Behavior<T>) -> Self {
        Self {
            name,
            uses_session: true,
            behavior,
            delay: Duration::ZERO,
        }
    }

    pub fn sessionless(mut self) -> Self {
        self.uses_session = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl<T: Clone + Send + Sync + 'static> Checker for StubChecker<T> {
    type Output = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn uses_session(&self) -> bool {
        self.uses_session
    }

    async fn run(&self, _session: &dyn PageSession) -> sugamya_checkers::Result<T> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            Behavior::Return(value) => Ok(value.clone()),
            Behavior::FailEvaluation => Err(CheckerError::Evaluation {
                checker: self.name,
                reason: "ReferenceError: axe is not defined".to_string(),
            }),
            Behavior::EngineUnavailable => Err(CheckerError::ScoreEngineUnavailable(
                "connect ECONNREFUSED 127.0.0.1:9222".to_string(),
            )),
            Behavior::LoseSession => Err(CheckerError::SessionLost {
                checker: self.name,
                reason: "Target closed".to_string(),
            }),
            Behavior::Panic => panic!("checker blew up"),
        }
    }
}

pub fn sample_findings() -> AxeFindings {
    AxeFindings {
        issues: vec![
            Issue::new(
                "color-contrast",
                Severity::Serious,
                "Elements must have sufficient color contrast",
            )
            .with_selector(".nav"),
            Issue::new("image-alt", Severity::Critical, "Images must have alternate text")
                .with_selector("img.logo")
                .with_snippet("<img class=\"logo\">"),
        ],
        violations: vec![RuleViolation {
            id: "color-contrast".to_string(),
            impact: Some("serious".to_string()),
            description: "Elements must have sufficient color contrast".to_string(),
            help: "Elements must have sufficient color contrast".to_string(),
            help_url: None,
            node_count: 1,
        }],
    }
}

pub fn passing_compliance() -> ComplianceResult {
    ComplianceResult {
        passed: true,
        total_checks: 8,
        passed_checks: 8,
        violations: Vec::new(),
        not_evaluated: Vec::new(),
    }
}

pub fn checker_set(
    rules: Behavior<AxeFindings>,
    compliance: Behavior<ComplianceResult>,
    score: Behavior<u8>,
) -> CheckerSet {
    CheckerSet::new(
        Arc::new(StubChecker::new("axe", rules)),
        Arc::new(StubChecker::new("gigw", compliance)),
        Arc::new(StubChecker::new("lighthouse", score).sessionless()),
    )
}

pub fn healthy_checkers() -> CheckerSet {
    checker_set(
        Behavior::Return(sample_findings()),
        Behavior::Return(passing_compliance()),
        Behavior::Return(87),
    )
}

pub fn orchestrator(
    db: &Database,
    sessions: Arc<FakeSessions>,
    checkers: CheckerSet,
) -> Arc<ScanOrchestrator> {
    Arc::new(ScanOrchestrator::new(
        sessions,
        Arc::new(db.clone()),
        checkers,
        ScanCoordinator::new(),
    ))
}

/// Discovery that returns a fixed page list.
pub struct ListDiscovery(pub Vec<String>);

#[async_trait::async_trait]
impl UrlDiscovery for ListDiscovery {
    async fn fetch_page_urls(&self, site_url: &str) -> Vec<String> {
        if self.0.is_empty() {
            vec![site_url.to_string()]
        } else {
            self.0.clone()
        }
    }
}
