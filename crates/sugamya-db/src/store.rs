//! The persistence interface the scan pipeline consumes.

use crate::error::Result;
use crate::{scans, Database};
use sugamya_core::{Diagnostics, Issue, NewScan, ScanId, ScanRecord, ScanStatus};

/// Narrow persistence interface used by the orchestrator and job queue.
///
/// Methods returning `bool` report whether a guarded status transition was
/// applied; `false` means the record was already past that point.
#[async_trait::async_trait]
pub trait ScanStore: Send + Sync {
    /// Create a `queued` scan record.
    async fn create_scan(&self, scan: NewScan) -> Result<ScanRecord>;

    /// Bulk-insert issues for a scan.
    async fn create_issues(&self, scan_id: &ScanId, issues: &[Issue]) -> Result<u64>;

    /// Move a scan to `status`, optionally setting score and diagnostics.
    async fn update_scan_status(
        &self,
        scan_id: &ScanId,
        status: ScanStatus,
        score: Option<u8>,
        diagnostics: Option<&Diagnostics>,
    ) -> Result<bool>;

    /// Atomically store issues, score and diagnostics and mark the scan completed.
    async fn complete_scan(
        &self,
        scan_id: &ScanId,
        issues: &[Issue],
        score: Option<u8>,
        diagnostics: &Diagnostics,
    ) -> Result<bool>;

    /// A scan with its findings.
    async fn get_scan(&self, scan_id: &ScanId) -> Result<ScanRecord>;

    /// Findings of a scan.
    async fn get_issues(&self, scan_id: &ScanId) -> Result<Vec<Issue>>;

    /// Children of a batch parent.
    async fn get_child_scans(&self, parent_id: &ScanId) -> Result<Vec<ScanRecord>>;

    /// Record batch progress on a parent.
    async fn update_parent_progress(
        &self,
        parent_id: &ScanId,
        completed: u32,
        status: ScanStatus,
    ) -> Result<bool>;
}

#[async_trait::async_trait]
impl ScanStore for Database {
    async fn create_scan(&self, scan: NewScan) -> Result<ScanRecord> {
        scans::create_scan(self.pool(), scan).await
    }

    async fn create_issues(&self, scan_id: &ScanId, issues: &[Issue]) -> Result<u64> {
        scans::create_issues(self.pool(), scan_id, issues).await
    }

    async fn update_scan_status(
        &self,
        scan_id: &ScanId,
        status: ScanStatus,
        score: Option<u8>,
        diagnostics: Option<&Diagnostics>,
    ) -> Result<bool> {
        scans::update_scan_status(self.pool(), scan_id, status, score, diagnostics).await
    }

    async fn complete_scan(
        &self,
        scan_id: &ScanId,
        issues: &[Issue],
        score: Option<u8>,
        diagnostics: &Diagnostics,
    ) -> Result<bool> {
        scans::complete_scan(self.pool(), scan_id, issues, score, diagnostics).await
    }

    async fn get_scan(&self, scan_id: &ScanId) -> Result<ScanRecord> {
        scans::get_scan(self.pool(), scan_id).await
    }

    async fn get_issues(&self, scan_id: &ScanId) -> Result<Vec<Issue>> {
        scans::get_issues(self.pool(), scan_id).await
    }

    async fn get_child_scans(&self, parent_id: &ScanId) -> Result<Vec<ScanRecord>> {
        scans::get_child_scans(self.pool(), parent_id).await
    }

    async fn update_parent_progress(
        &self,
        parent_id: &ScanId,
        completed: u32,
        status: ScanStatus,
    ) -> Result<bool> {
        scans::update_parent_progress(self.pool(), parent_id, completed, status).await
    }
}
