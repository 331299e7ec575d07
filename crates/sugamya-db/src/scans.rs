//! Scan record and issue persistence.
//!
//! Status changes are guarded in SQL by the allowed predecessor set, so a
//! record never moves backwards even with concurrent writers. Guarded updates
//! return `false` when the transition was refused.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use sugamya_core::{Diagnostics, Issue, NewScan, ScanId, ScanRecord, ScanStatus, Severity};

type ScanRow = (
    String,
    String,
    String,
    String,
    Option<i64>,
    String,
    i64,
    i64,
    Option<String>,
    String,
    String,
);

const SCAN_COLUMNS: &str = "id, website_id, url, status, score, diagnostics, total_pages, \
     completed_pages, parent_scan_id, created_at, updated_at";

fn status_list(statuses: &[ScanStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{value}': {e}")))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode_scan(row: ScanRow, findings: Vec<Issue>) -> Result<ScanRecord> {
    let (
        id,
        website_id,
        url,
        status,
        score,
        diagnostics,
        total,
        completed,
        parent,
        created,
        updated,
    ) = row;

    let id = ScanId::new(id).map_err(|e| DatabaseError::Decode(e.to_string()))?;
    let status =
        ScanStatus::from_str(&status).map_err(|e| DatabaseError::Decode(e.to_string()))?;
    let parent_scan_id = parent
        .map(ScanId::new)
        .transpose()
        .map_err(|e| DatabaseError::Decode(e.to_string()))?;

    Ok(ScanRecord {
        id,
        website_id,
        url,
        status,
        score: score.map(|s| s.clamp(0, 100) as u8),
        findings,
        diagnostics: serde_json::from_str(&diagnostics)?,
        total_pages: total.max(0) as u32,
        completed_pages: completed.max(0) as u32,
        parent_scan_id,
        created_at: parse_time(&created)?,
        updated_at: parse_time(&updated)?,
    })
}

/// Insert a new `queued` scan record.
pub async fn create_scan(pool: &SqlitePool, scan: NewScan) -> Result<ScanRecord> {
    let id = ScanId::generate();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO scans (id, website_id, url, status, diagnostics, total_pages, completed_pages,
                            parent_scan_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, '{}', ?, 0, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(&scan.website_id)
    .bind(&scan.url)
    .bind(ScanStatus::Queued.as_str())
    .bind(i64::from(scan.total_pages))
    .bind(scan.parent_scan_id.as_ref().map(ScanId::as_str))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    tracing::debug!(scan_id = %id, url = %scan.url, "Scan record created");

    Ok(ScanRecord {
        id,
        website_id: scan.website_id,
        url: scan.url,
        status: ScanStatus::Queued,
        score: None,
        findings: Vec::new(),
        diagnostics: Diagnostics::default(),
        total_pages: scan.total_pages,
        completed_pages: 0,
        parent_scan_id: scan.parent_scan_id,
        created_at: now,
        updated_at: now,
    })
}

async fn insert_issues(
    tx: &mut Transaction<'_, Sqlite>,
    scan_id: &ScanId,
    issues: &[Issue],
) -> Result<u64> {
    let mut inserted = 0;
    for issue in issues {
        inserted += sqlx::query(
            "INSERT INTO issues (scan_id, rule_id, severity, selector, snippet, description)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(scan_id.as_str())
        .bind(&issue.rule_id)
        .bind(issue.severity.as_str())
        .bind(issue.selector.as_deref())
        .bind(issue.snippet.as_deref())
        .bind(&issue.description)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

/// Bulk-insert issues in one transaction. An empty slice is a no-op.
pub async fn create_issues(pool: &SqlitePool, scan_id: &ScanId, issues: &[Issue]) -> Result<u64> {
    if issues.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let inserted = insert_issues(&mut tx, scan_id, issues).await?;
    tx.commit().await?;
    Ok(inserted)
}

async fn ensure_exists(pool: &SqlitePool, scan_id: &ScanId) -> Result<()> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans WHERE id = ?")
        .bind(scan_id.as_str())
        .fetch_one(pool)
        .await?;
    if exists == 0 {
        return Err(DatabaseError::NotFound(format!("scan '{scan_id}' not found")));
    }
    Ok(())
}

/// Move a scan to `status`, optionally setting score and diagnostics.
///
/// `None` leaves the stored value untouched.
pub async fn update_scan_status(
    pool: &SqlitePool,
    scan_id: &ScanId,
    status: ScanStatus,
    score: Option<u8>,
    diagnostics: Option<&Diagnostics>,
) -> Result<bool> {
    let diagnostics = diagnostics.map(serde_json::to_string).transpose()?;
    let sql = format!(
        "UPDATE scans
         SET status = ?,
             score = COALESCE(?, score),
             diagnostics = COALESCE(?, diagnostics),
             updated_at = ?
         WHERE id = ? AND status IN ({})",
        status_list(ScanStatus::predecessors(status))
    );

    let result = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(score.map(i64::from))
        .bind(diagnostics)
        .bind(Utc::now().to_rfc3339())
        .bind(scan_id.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        ensure_exists(pool, scan_id).await?;
        tracing::debug!(scan_id = %scan_id, to = status.as_str(), "Status transition refused");
        return Ok(false);
    }
    Ok(true)
}

/// Store a finished scan atomically: issues, score, diagnostics and the
/// `processing → completed` transition commit together or not at all.
pub async fn complete_scan(
    pool: &SqlitePool,
    scan_id: &ScanId,
    issues: &[Issue],
    score: Option<u8>,
    diagnostics: &Diagnostics,
) -> Result<bool> {
    let diagnostics = serde_json::to_string(diagnostics)?;
    let sql = format!(
        "UPDATE scans SET status = ?, score = ?, diagnostics = ?, updated_at = ?
         WHERE id = ? AND status IN ({})",
        status_list(ScanStatus::predecessors(ScanStatus::Completed))
    );

    let mut tx = pool.begin().await?;
    let updated = sqlx::query(&sql)
        .bind(ScanStatus::Completed.as_str())
        .bind(score.map(i64::from))
        .bind(diagnostics)
        .bind(Utc::now().to_rfc3339())
        .bind(scan_id.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        ensure_exists(pool, scan_id).await?;
        tracing::warn!(scan_id = %scan_id, "Scan not processing, results discarded");
        return Ok(false);
    }

    insert_issues(&mut tx, scan_id, issues).await?;
    tx.commit().await?;
    Ok(true)
}

/// Issues for a scan in insertion order.
pub async fn get_issues(pool: &SqlitePool, scan_id: &ScanId) -> Result<Vec<Issue>> {
    let rows = sqlx::query_as::<_, (String, String, Option<String>, Option<String>, String)>(
        "SELECT rule_id, severity, selector, snippet, description
         FROM issues WHERE scan_id = ? ORDER BY id",
    )
    .bind(scan_id.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(rule_id, severity, selector, snippet, description)| {
            let severity = Severity::from_str(&severity)
                .map_err(|e| DatabaseError::Decode(e.to_string()))?;
            Ok(Issue {
                rule_id,
                severity,
                selector,
                snippet,
                description,
            })
        })
        .collect()
}

/// A scan with its findings.
pub async fn get_scan(pool: &SqlitePool, scan_id: &ScanId) -> Result<ScanRecord> {
    let sql = format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?");
    let row = sqlx::query_as::<_, ScanRow>(&sql)
        .bind(scan_id.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("scan '{scan_id}' not found")))?;

    let findings = get_issues(pool, scan_id).await?;
    decode_scan(row, findings)
}

/// Children of a batch parent, oldest first, without findings.
pub async fn get_child_scans(pool: &SqlitePool, parent_id: &ScanId) -> Result<Vec<ScanRecord>> {
    let rows = sqlx::query_as::<_, ScanRow>(&format!(
        "SELECT {SCAN_COLUMNS} FROM scans WHERE parent_scan_id = ? ORDER BY created_at, rowid"
    ))
    .bind(parent_id.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|row| decode_scan(row, Vec::new())).collect()
}

/// Record batch progress on a parent.
///
/// `completed_pages` never decreases, and a parent that already reached a
/// terminal status is left alone.
pub async fn update_parent_progress(
    pool: &SqlitePool,
    parent_id: &ScanId,
    completed: u32,
    status: ScanStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE scans
         SET completed_pages = MAX(completed_pages, ?), status = ?, updated_at = ?
         WHERE id = ? AND status IN ('queued', 'processing')",
    )
    .bind(i64::from(completed))
    .bind(status.as_str())
    .bind(Utc::now().to_rfc3339())
    .bind(parent_id.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        ensure_exists(pool, parent_id).await?;
        return Ok(false);
    }
    Ok(true)
}
