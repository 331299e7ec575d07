//! Round-robin pool of pre-launched browsers.
//!
//! Amortises launch latency across scans. Every checkout health-checks the
//! selected instance and relaunches it if the connection is gone.

use crate::error::{BrowserError, Result};
use crate::launcher::{self, classify_cdp_error, LaunchedBrowser};
use chromiumoxide::Page;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use sugamya_core::BrowserConfig;
use tokio::sync::Mutex;

/// Pool of browser instances, cheap to clone.
#[derive(Clone)]
pub struct BrowserPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    slots: Vec<Mutex<Option<LaunchedBrowser>>>,
    cursor: SlotCursor,
    config: BrowserConfig,
}

/// Atomic round-robin slot selector.
#[derive(Debug)]
struct SlotCursor {
    next: AtomicUsize,
    len: usize,
}

impl SlotCursor {
    fn new(len: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
        }
    }

    fn next(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.len
    }
}

impl BrowserPool {
    /// Create a pool of `size` slots. Browsers launch lazily on first checkout.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(size: usize, config: BrowserConfig) -> Self {
        assert!(size > 0, "browser pool needs at least one slot");
        let slots = (0..size).map(|_| Mutex::new(None)).collect();
        Self {
            inner: Arc::new(PoolInner {
                slots,
                cursor: SlotCursor::new(size),
                config,
            }),
        }
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.inner.slots.len()
    }

    /// Launch every empty slot up front.
    pub async fn warm_up(&self) -> Result<()> {
        for (slot, entry) in self.inner.slots.iter().enumerate() {
            let mut guard = entry.lock().await;
            if guard.is_none() {
                *guard = Some(launcher::launch(&self.inner.config).await?);
                tracing::info!(slot, "Pooled browser launched");
            }
        }
        Ok(())
    }

    /// Open a blank page on the next healthy browser.
    ///
    /// Returns the page and the slot it came from.
    pub(crate) async fn checkout_page(&self) -> Result<(Page, usize)> {
        let slot = self.inner.cursor.next();
        let mut guard = self.inner.slots[slot].lock().await;

        if let Some(existing) = guard.as_ref() {
            if !existing.is_healthy().await {
                tracing::warn!(slot, "Pooled browser disconnected, replacing");
                if let Some(dead) = guard.take() {
                    dead.shutdown().await;
                }
            }
        }

        if guard.is_none() {
            *guard = Some(launcher::launch(&self.inner.config).await?);
            tracing::info!(slot, "Pooled browser launched");
        }

        let browser = guard
            .as_ref()
            .ok_or_else(|| BrowserError::LaunchFailure("pool slot empty after launch".into()))?;
        let page = browser
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| match classify_cdp_error(&e) {
                lost @ BrowserError::SessionLost(_) => lost,
                other => BrowserError::LaunchFailure(other.to_string()),
            })?;

        Ok((page, slot))
    }

    /// Tear down the browser in `slot`; the next checkout relaunches it.
    pub(crate) async fn invalidate(&self, slot: usize) {
        let Some(entry) = self.inner.slots.get(slot) else {
            return;
        };
        if let Some(browser) = entry.lock().await.take() {
            tracing::warn!(slot, "Invalidating pooled browser after session loss");
            browser.shutdown().await;
        }
    }

    /// Close every pooled browser.
    pub async fn shutdown(&self) {
        for entry in &self.inner.slots {
            if let Some(browser) = entry.lock().await.take() {
                browser.shutdown().await;
            }
        }
        tracing::info!("Browser pool shut down");
    }
}
