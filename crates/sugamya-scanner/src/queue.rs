//! Bounded job queue and worker pool.
//!
//! Callers get a scan id back as soon as the `queued` record exists; the scan
//! itself runs on one of N worker tasks. Each queued job carries its
//! [`InFlightGuard`] so the drain accounts for work that has not started yet.

use crate::coordinator::{DrainReport, InFlightGuard, ScanCoordinator};
use crate::error::{Result, ScanError};
use crate::orchestrator::ScanOrchestrator;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use sugamya_core::{
    Diagnostics, NewScan, ScanId, ScanJob, ScanRecord, ScanStatus, ScanningConfig,
};
use sugamya_db::ScanStore;
use sugamya_discovery::UrlDiscovery;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct QueuedJob {
    job: ScanJob,
    guard: InFlightGuard,
}

/// Ids created by a batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSubmission {
    /// Parent record tracking batch progress
    pub parent_id: ScanId,
    /// One child record per discovered page, in discovery order
    pub child_ids: Vec<ScanId>,
}

/// Bounded FIFO of scan jobs drained by a fixed set of workers.
pub struct JobQueue {
    orchestrator: Arc<ScanOrchestrator>,
    store: Arc<dyn ScanStore>,
    discovery: Arc<dyn UrlDiscovery>,
    coordinator: Arc<ScanCoordinator>,
    sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
    max_batch_pages: usize,
}

impl JobQueue {
    /// Create the queue and spawn `config.workers` workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        orchestrator: Arc<ScanOrchestrator>,
        store: Arc<dyn ScanStore>,
        discovery: Arc<dyn UrlDiscovery>,
        config: &ScanningConfig,
    ) -> Arc<Self> {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel::<QueuedJob>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers: Vec<JoinHandle<()>> = (0..config.workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(QueuedJob { job, guard }) = next else {
                            break;
                        };
                        orchestrator.run(job).await;
                        drop(guard);
                    }
                    tracing::debug!(worker, "Scan worker stopped");
                })
            })
            .collect();

        tracing::info!(
            workers = config.workers.max(1),
            capacity,
            "Scan queue started"
        );

        Arc::new(Self {
            coordinator: Arc::clone(orchestrator.coordinator()),
            orchestrator,
            store,
            discovery,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            capacity,
            max_batch_pages: config.max_batch_pages.max(1),
        })
    }

    fn sender(&self) -> Result<mpsc::Sender<QueuedJob>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ScanError::ShutdownInProgress)
    }

    /// Accept a single-page scan and return its id without waiting for it.
    ///
    /// Refused with `ShutdownInProgress` while draining and with `QueueFull`
    /// when the queue is at capacity; no record is created in either case.
    pub async fn submit(&self, website_id: &str, url: &str) -> Result<ScanId> {
        let guard = self.coordinator.admit()?;
        let sender = self.sender()?;
        let permit = sender.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => ScanError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(()) => ScanError::ShutdownInProgress,
        })?;

        let record = self.store.create_scan(NewScan::single(website_id, url)).await?;
        let scan_id = record.id.clone();
        permit.send(QueuedJob {
            job: job_for(record),
            guard,
        });

        tracing::info!(scan_id = %scan_id, url, "Scan queued");
        Ok(scan_id)
    }

    /// Discover a site's pages and queue one child scan per page under a
    /// new parent record.
    ///
    /// Waits for queue space rather than failing when the queue is full. If
    /// draining starts midway, the pages not yet queued are recorded as
    /// failed and the parent is rolled up. If a child record cannot be
    /// created, the parent and the children created so far are failed.
    pub async fn submit_batch(
        &self,
        website_id: &str,
        site_url: &str,
    ) -> Result<BatchSubmission> {
        if self.coordinator.is_draining() {
            return Err(ScanError::ShutdownInProgress);
        }

        let mut pages = self.discovery.fetch_page_urls(site_url).await;
        pages.truncate(self.max_batch_pages);
        if pages.is_empty() {
            pages.push(site_url.to_string());
        }

        let parent = self
            .store
            .create_scan(NewScan {
                website_id: website_id.to_string(),
                url: site_url.to_string(),
                parent_scan_id: None,
                total_pages: u32::try_from(pages.len()).unwrap_or(u32::MAX),
            })
            .await?;

        let mut children = Vec::with_capacity(pages.len());
        for page in pages {
            let created = self
                .store
                .create_scan(NewScan {
                    website_id: website_id.to_string(),
                    url: page,
                    parent_scan_id: Some(parent.id.clone()),
                    total_pages: 1,
                })
                .await;
            match created {
                Ok(child) => children.push(child),
                Err(e) => {
                    let err = ScanError::from(e);
                    tracing::error!(
                        parent_id = %parent.id,
                        created = children.len(),
                        "Batch creation failed: {}",
                        err
                    );
                    let diagnostics = Diagnostics::failed(err.failure_reason(), err.to_string());
                    let ids: Vec<&ScanId> = children.iter().map(|c| &c.id).collect();
                    self.fail_records(&ids, &diagnostics).await;
                    self.fail_records(&[&parent.id], &diagnostics).await;
                    return Err(err);
                }
            }
        }
        let child_ids: Vec<ScanId> = children.iter().map(|c| c.id.clone()).collect();

        let mut queued = 0;
        let mut rejected = None;
        for child in children {
            if let Err(err) = self.enqueue(job_for(child)).await {
                rejected = Some(err);
                break;
            }
            queued += 1;
        }

        if let Some(err) = rejected {
            tracing::warn!(
                parent_id = %parent.id,
                queued,
                rejected = child_ids.len() - queued,
                "Batch cut short: {}",
                err
            );
            let diagnostics = Diagnostics::failed(err.failure_reason(), err.to_string());
            let unqueued: Vec<&ScanId> = child_ids[queued..].iter().collect();
            self.fail_records(&unqueued, &diagnostics).await;
            self.orchestrator.rollup_parent(&parent.id).await?;
        } else {
            tracing::info!(parent_id = %parent.id, pages = child_ids.len(), "Batch queued");
        }

        Ok(BatchSubmission {
            parent_id: parent.id,
            child_ids,
        })
    }

    /// Mark records that will never run as failed. Write errors are logged
    /// and the remaining records are still attempted.
    async fn fail_records(&self, ids: &[&ScanId], diagnostics: &Diagnostics) {
        for id in ids {
            if let Err(e) = self
                .store
                .update_scan_status(id, ScanStatus::Failed, None, Some(diagnostics))
                .await
            {
                tracing::error!(scan_id = %id, "Could not fail unqueued scan: {}", e);
            }
        }
    }

    async fn enqueue(&self, job: ScanJob) -> Result<()> {
        let guard = self.coordinator.admit()?;
        let sender = self.sender()?;
        let permit = tokio::select! {
            permit = sender.reserve() => permit.map_err(|_| ScanError::ShutdownInProgress)?,
            () = self.coordinator.draining() => return Err(ScanError::ShutdownInProgress),
        };
        permit.send(QueuedJob { job, guard });
        Ok(())
    }

    /// Jobs waiting for a worker.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }

    /// Jobs admitted and not yet terminal, queued or running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    /// Queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The admission coordinator shared with the orchestrator.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<ScanCoordinator> {
        &self.coordinator
    }

    /// Stop accepting work, close the queue and wait for in-flight jobs.
    ///
    /// Jobs still queued when the drain starts are failed as
    /// `server_shutdown` by the workers. Workers are aborted if the ceiling
    /// is reached.
    pub async fn shutdown(&self, poll_interval: Duration, ceiling: Duration) -> DrainReport {
        self.coordinator.begin_drain();
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let report = self.coordinator.drain(poll_interval, ceiling).await;

        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if report.is_clean() {
            for worker in workers {
                if let Err(e) = worker.await {
                    tracing::warn!("Scan worker ended abnormally: {}", e);
                }
            }
        } else {
            for worker in workers {
                worker.abort();
            }
        }
        report
    }
}

fn job_for(record: ScanRecord) -> ScanJob {
    ScanJob {
        scan_id: record.id,
        website_id: record.website_id,
        target_url: record.url,
        parent_scan_id: record.parent_scan_id,
    }
}
