//! Wiring of the scan pipeline for one CLI invocation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sugamya_browser::ChromiumSessionManager;
use sugamya_core::{AppConfig, ScanId};
use sugamya_db::{Database, ScanStore};
use sugamya_discovery::SitemapDiscovery;
use sugamya_report::JsonReportRenderer;
use sugamya_scanner::{
    CheckerSet, DrainReport, JobQueue, ReportService, ScanCoordinator, ScanOrchestrator,
};

/// Open the configured database and bring its schema up to date.
pub async fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let db = Database::new(&path).await?;
    db.run_migrations().await?;
    tracing::info!("Database: {}", path.display());
    Ok(db)
}

/// Report service writing JSON reports to the configured directory.
pub fn report_service(config: &AppConfig, db: &Database) -> Result<ReportService> {
    let renderer = JsonReportRenderer::new(config.reports_dir()?);
    Ok(ReportService::new(Arc::new(db.clone()), Arc::new(renderer)))
}

/// A running scan pipeline.
pub struct App {
    config: AppConfig,
    db: Database,
    sessions: Arc<ChromiumSessionManager>,
    queue: Arc<JobQueue>,
    reports: ReportService,
}

impl App {
    /// Open storage, start the browser manager and the worker pool.
    pub async fn start(config: AppConfig) -> Result<Self> {
        let db = open_database(&config).await?;
        let store: Arc<dyn ScanStore> = Arc::new(db.clone());

        let sessions = Arc::new(ChromiumSessionManager::new(config.browser.clone()));
        if let Err(e) = sessions.warm_up().await {
            tracing::warn!("Browser pool warm-up failed, launching on demand: {}", e);
        }
        let checkers =
            CheckerSet::from_config(&config.checkers).context("loading axe-core script")?;
        let orchestrator = Arc::new(ScanOrchestrator::new(
            sessions.clone(),
            Arc::clone(&store),
            checkers,
            ScanCoordinator::new(),
        ));
        let discovery = Arc::new(SitemapDiscovery::new(&config.scanning)?);
        let queue = JobQueue::start(orchestrator, store, discovery, &config.scanning);
        let reports = report_service(&config, &db)?;

        Ok(Self {
            config,
            db,
            sessions,
            queue,
            reports,
        })
    }

    /// The job queue scans are submitted to.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Storage the pipeline writes to.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Render the report for `scan_id`.
    pub async fn render_report(&self, scan_id: &ScanId) -> Result<PathBuf> {
        Ok(self.reports.render(scan_id).await?)
    }

    /// Wait until every admitted scan has settled or `interrupt` resolves,
    /// then drain and tear everything down.
    pub async fn run_until_idle(
        &self,
        interrupt: impl std::future::Future<Output = ()>,
    ) -> DrainReport {
        tokio::select! {
            () = self.queue.coordinator().wait_idle() => {
                tracing::debug!("All scans settled");
            }
            () = interrupt => {}
        }

        let report = self
            .queue
            .shutdown(
                Duration::from_millis(self.config.shutdown.poll_interval_ms),
                Duration::from_secs(self.config.shutdown.drain_timeout_secs),
            )
            .await;
        self.sessions.shutdown().await;

        if report.is_clean() {
            tracing::info!("Shutdown complete");
        } else {
            tracing::warn!(abandoned = report.abandoned, "Exiting with scans still in flight");
        }
        report
    }
}
