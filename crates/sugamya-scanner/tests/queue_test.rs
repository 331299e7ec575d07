mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sugamya_core::{
    Diagnostics, FailureReason, Issue, NewScan, ScanId, ScanRecord, ScanStatus, ScanningConfig,
};
use sugamya_db::{Database, DatabaseError, ScanStore};
use sugamya_scanner::{JobQueue, ScanError};

fn config(workers: usize, queue_capacity: usize, max_batch_pages: usize) -> ScanningConfig {
    ScanningConfig {
        workers,
        queue_capacity,
        max_batch_pages,
        ..ScanningConfig::default()
    }
}

fn start_queue(
    db: &Database,
    sessions: Arc<FakeSessions>,
    pages: Vec<String>,
    config: &ScanningConfig,
) -> Arc<JobQueue> {
    JobQueue::start(
        orchestrator(db, sessions, healthy_checkers()),
        Arc::new(db.clone()),
        Arc::new(ListDiscovery(pages)),
        config,
    )
}

async fn wait_for_acquire_calls(sessions: &FakeSessions, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while sessions.acquire_calls() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker picked up the job");
}

#[tokio::test]
async fn test_submit_runs_in_background() {
    let db = setup_db().await;
    let sessions = Arc::new(FakeSessions::healthy());
    let queue = start_queue(&db, Arc::clone(&sessions), Vec::new(), &config(2, 8, 50));

    let scan_id = queue
        .submit("site-1", "https://example.gov.in/")
        .await
        .expect("submit");

    queue.coordinator().wait_idle().await;

    let scan = db.get_scan(&scan_id).await.expect("get scan");
    assert_eq!(scan.status, ScanStatus::Completed);
    assert_eq!(scan.score, Some(87));
    assert_eq!(sessions.released(), 1);
    assert_eq!(queue.in_flight(), 0);
    assert_eq!(queue.queue_depth(), 0);
}

#[tokio::test]
async fn test_submit_while_draining_is_refused() {
    let db = setup_db().await;
    let queue = start_queue(
        &db,
        Arc::new(FakeSessions::healthy()),
        Vec::new(),
        &config(1, 4, 50),
    );
    queue.coordinator().begin_drain();

    let result = queue.submit("site-1", "https://example.com/").await;
    assert!(matches!(result, Err(ScanError::ShutdownInProgress)));

    let batch = queue.submit_batch("site-1", "https://example.com/").await;
    assert!(matches!(batch, Err(ScanError::ShutdownInProgress)));
    assert_eq!(queue.in_flight(), 0);
}

#[tokio::test]
async fn test_full_queue_rejects_submission() {
    let db = setup_db().await;
    let (sessions, gate) = FakeSessions::gated();
    let sessions = Arc::new(sessions);
    let queue = start_queue(&db, Arc::clone(&sessions), Vec::new(), &config(1, 1, 50));

    let running = queue.submit("site-1", "https://example.com/a").await.expect("first");
    wait_for_acquire_calls(&sessions, 1).await;

    let waiting = queue.submit("site-1", "https://example.com/b").await.expect("second");
    assert_eq!(queue.queue_depth(), 1);

    let rejected = queue.submit("site-1", "https://example.com/c").await;
    assert!(matches!(rejected, Err(ScanError::QueueFull { capacity: 1 })));
    assert_eq!(queue.in_flight(), 2);

    gate.add_permits(2);
    queue.coordinator().wait_idle().await;

    for id in [running, waiting] {
        let scan = db.get_scan(&id).await.expect("get scan");
        assert_eq!(scan.status, ScanStatus::Completed);
    }
}

#[tokio::test]
async fn test_batch_creates_parent_and_children() {
    let db = setup_db().await;
    let sessions = Arc::new(FakeSessions::healthy());
    let pages = (1..=3).map(|i| format!("https://example.com/p{i}")).collect();
    let queue = start_queue(&db, Arc::clone(&sessions), pages, &config(2, 2, 50));

    let batch = queue
        .submit_batch("site-1", "https://example.com/")
        .await
        .expect("submit batch");
    assert_eq!(batch.child_ids.len(), 3);

    queue.coordinator().wait_idle().await;

    let parent = db.get_scan(&batch.parent_id).await.expect("get parent");
    assert_eq!(parent.total_pages, 3);
    assert_eq!(parent.completed_pages, 3);
    assert_eq!(parent.status, ScanStatus::Completed);

    let children = db.get_child_scans(&batch.parent_id).await.expect("children");
    assert_eq!(children.len(), 3);
    assert!(children.iter().all(|c| c.status == ScanStatus::Completed));
    assert_eq!(sessions.released(), 3);
}

#[tokio::test]
async fn test_batch_is_capped() {
    let db = setup_db().await;
    let pages = (0..10).map(|i| format!("https://example.com/p{i}")).collect();
    let queue = start_queue(&db, Arc::new(FakeSessions::healthy()), pages, &config(1, 4, 4));

    let batch = queue
        .submit_batch("site-1", "https://example.com/")
        .await
        .expect("submit batch");
    assert_eq!(batch.child_ids.len(), 4);

    queue.coordinator().wait_idle().await;
    let parent = db.get_scan(&batch.parent_id).await.expect("get parent");
    assert_eq!(parent.total_pages, 4);
    assert_eq!(parent.status, ScanStatus::Completed);
}

#[tokio::test]
async fn test_shutdown_fails_queued_jobs_and_waits_for_running_one() {
    let db = setup_db().await;
    let (sessions, gate) = FakeSessions::gated();
    let sessions = Arc::new(sessions);
    let queue = start_queue(&db, Arc::clone(&sessions), Vec::new(), &config(1, 4, 50));

    let running = queue.submit("site-1", "https://example.com/a").await.expect("first");
    wait_for_acquire_calls(&sessions, 1).await;
    let queued = queue.submit("site-1", "https://example.com/b").await.expect("second");

    let shutdown = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue
                .shutdown(Duration::from_millis(20), Duration::from_secs(10))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        queue.submit("site-1", "https://example.com/c").await,
        Err(ScanError::ShutdownInProgress)
    ));

    gate.add_permits(1);
    let report = shutdown.await.expect("shutdown task");
    assert!(report.is_clean());

    let first = db.get_scan(&running).await.expect("get scan");
    assert_eq!(first.status, ScanStatus::Completed);

    let second = db.get_scan(&queued).await.expect("get scan");
    assert_eq!(second.status, ScanStatus::Failed);
    assert_eq!(
        second.diagnostics.failure.map(|f| f.reason),
        Some(FailureReason::ServerShutdown)
    );
    assert_eq!(sessions.acquire_calls(), 1);
}

#[tokio::test]
async fn test_shutdown_abandons_stuck_jobs_at_ceiling() {
    let db = setup_db().await;
    let (sessions, _gate) = FakeSessions::gated();
    let sessions = Arc::new(sessions);
    let queue = start_queue(&db, Arc::clone(&sessions), Vec::new(), &config(1, 4, 50));

    queue.submit("site-1", "https://example.com/").await.expect("submit");
    wait_for_acquire_calls(&sessions, 1).await;

    let report = queue
        .shutdown(Duration::from_millis(20), Duration::from_millis(200))
        .await;

    assert_eq!(report.abandoned, 1);
    assert!(report.elapsed >= Duration::from_millis(200));
    assert!(report.elapsed < Duration::from_secs(5));
}

/// Store whose `create_scan` fails from the given call onwards.
struct FailingCreateStore {
    inner: Database,
    creates: AtomicUsize,
    fail_from: usize,
    created: Mutex<Vec<ScanId>>,
}

#[async_trait::async_trait]
impl ScanStore for FailingCreateStore {
    async fn create_scan(&self, scan: NewScan) -> sugamya_db::Result<ScanRecord> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_from {
            return Err(DatabaseError::Io(std::io::Error::other("disk full")));
        }
        let record = self.inner.create_scan(scan).await?;
        self.created.lock().unwrap().push(record.id.clone());
        Ok(record)
    }

    async fn create_issues(&self, scan_id: &ScanId, issues: &[Issue]) -> sugamya_db::Result<u64> {
        self.inner.create_issues(scan_id, issues).await
    }

    async fn update_scan_status(
        &self,
        scan_id: &ScanId,
        status: ScanStatus,
        score: Option<u8>,
        diagnostics: Option<&Diagnostics>,
    ) -> sugamya_db::Result<bool> {
        self.inner
            .update_scan_status(scan_id, status, score, diagnostics)
            .await
    }

    async fn complete_scan(
        &self,
        scan_id: &ScanId,
        issues: &[Issue],
        score: Option<u8>,
        diagnostics: &Diagnostics,
    ) -> sugamya_db::Result<bool> {
        self.inner
            .complete_scan(scan_id, issues, score, diagnostics)
            .await
    }

    async fn get_scan(&self, scan_id: &ScanId) -> sugamya_db::Result<ScanRecord> {
        self.inner.get_scan(scan_id).await
    }

    async fn get_issues(&self, scan_id: &ScanId) -> sugamya_db::Result<Vec<Issue>> {
        self.inner.get_issues(scan_id).await
    }

    async fn get_child_scans(&self, parent_id: &ScanId) -> sugamya_db::Result<Vec<ScanRecord>> {
        self.inner.get_child_scans(parent_id).await
    }

    async fn update_parent_progress(
        &self,
        parent_id: &ScanId,
        completed: u32,
        status: ScanStatus,
    ) -> sugamya_db::Result<bool> {
        self.inner
            .update_parent_progress(parent_id, completed, status)
            .await
    }
}

#[tokio::test]
async fn test_batch_creation_failure_leaves_nothing_queued() {
    let db = setup_db().await;
    let sessions = Arc::new(FakeSessions::healthy());
    let pages = (1..=3).map(|i| format!("https://example.com/p{i}")).collect();
    // Parent and first child are created, the second child is not.
    let store = Arc::new(FailingCreateStore {
        inner: db.clone(),
        creates: AtomicUsize::new(0),
        fail_from: 3,
        created: Mutex::new(Vec::new()),
    });
    let queue = JobQueue::start(
        orchestrator(&db, Arc::clone(&sessions), healthy_checkers()),
        Arc::clone(&store) as Arc<dyn ScanStore>,
        Arc::new(ListDiscovery(pages)),
        &config(1, 4, 50),
    );

    let result = queue.submit_batch("site-1", "https://example.com/").await;
    assert!(matches!(result, Err(ScanError::Database(_))));

    let created = store.created.lock().unwrap().clone();
    assert_eq!(created.len(), 2);
    for id in &created {
        let scan = db.get_scan(id).await.expect("get scan");
        assert_eq!(scan.status, ScanStatus::Failed);
        assert_eq!(
            scan.diagnostics.failure.map(|f| f.reason),
            Some(FailureReason::ConnectionRefused)
        );
    }

    let parent = db.get_scan(&created[0]).await.expect("get parent");
    assert!(parent.parent_scan_id.is_none());
    let children = db.get_child_scans(&created[0]).await.expect("children");
    assert_eq!(children.len(), 1);

    assert_eq!(queue.in_flight(), 0);
    assert_eq!(sessions.acquire_calls(), 0);
}
