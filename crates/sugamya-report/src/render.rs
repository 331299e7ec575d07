//! Rendering seam.
//!
//! The core hands a finished [`AccessibilityReport`] to a renderer and knows
//! nothing about the output format. PDF/HTML renderers live outside this
//! crate; [`JsonReportRenderer`] is the built-in one.

use crate::error::Result;
use crate::report::AccessibilityReport;
use std::path::{Path, PathBuf};

/// Turns an aggregated report into an artifact on disk.
#[async_trait::async_trait]
pub trait ReportRenderer: Send + Sync {
    /// File extension of the produced artifact, without the dot
    fn extension(&self) -> &'static str;

    /// Render `report` and return where it was written.
    async fn render(&self, report: &AccessibilityReport) -> Result<PathBuf>;
}

/// Writes `<output_dir>/<scan_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonReportRenderer {
    output_dir: PathBuf,
}

impl JsonReportRenderer {
    /// Renderer writing into `output_dir`, created on first render.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Where reports are written.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait::async_trait]
impl ReportRenderer for JsonReportRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    async fn render(&self, report: &AccessibilityReport) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let path = self
            .output_dir
            .join(format!("{}.{}", report.scan_id, self.extension()));
        let body = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, body).await?;

        tracing::info!(scan_id = %report.scan_id, path = %path.display(), "Report written");
        Ok(path)
    }
}
