//! Report requests: load a scan, aggregate it, hand it to a renderer.

use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use sugamya_core::{ScanId, ScanRecord, ScanStatus};
use sugamya_db::ScanStore;
use sugamya_report::{AccessibilityReport, ReportRenderer};

/// Builds reports on demand from persisted scans.
pub struct ReportService {
    store: Arc<dyn ScanStore>,
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportService {
    /// Create a report service.
    #[must_use]
    pub fn new(store: Arc<dyn ScanStore>, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Aggregate a scan into a report.
    ///
    /// A batch parent reports the findings of its completed pages, and the
    /// mean of their scores.
    pub async fn build(&self, scan_id: &ScanId) -> Result<AccessibilityReport> {
        let mut record = self.store.get_scan(scan_id).await?;
        let children = self.store.get_child_scans(scan_id).await?;
        if !children.is_empty() {
            self.merge_children(&mut record, &children).await?;
        }
        Ok(AccessibilityReport::build(&record))
    }

    /// Build and render a report, returning the artifact path.
    pub async fn render(&self, scan_id: &ScanId) -> Result<PathBuf> {
        let report = self.build(scan_id).await?;
        Ok(self.renderer.render(&report).await?)
    }

    async fn merge_children(&self, parent: &mut ScanRecord, children: &[ScanRecord]) -> Result<()> {
        let mut scores = Vec::new();
        for child in children.iter().filter(|c| c.status == ScanStatus::Completed) {
            parent.findings.extend(self.store.get_issues(&child.id).await?);
            scores.extend(child.score.map(u32::from));
        }

        if parent.score.is_none() && !scores.is_empty() {
            let count = u32::try_from(scores.len()).unwrap_or(u32::MAX);
            let mean = (scores.iter().sum::<u32>() + count / 2) / count;
            parent.score = u8::try_from(mean).ok();
        }
        tracing::debug!(
            scan_id = %parent.id,
            pages = children.len(),
            issues = parent.findings.len(),
            "Merged batch pages into report"
        );
        Ok(())
    }
}
