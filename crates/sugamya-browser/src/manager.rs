//! Chromium-backed session manager.

use crate::error::{BrowserError, Result};
use crate::launcher::{self, classify_cdp_error, LaunchedBrowser};
use crate::pool::BrowserPool;
use crate::session::{validate_target_url, NavigationProfile, PageSession, SessionProvider};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sugamya_core::BrowserConfig;

/// Poll interval while waiting for the document to leave the `loading` state.
const READY_POLL_MS: u64 = 100;

/// Resolves once the navigated document has parsed ("content loaded"),
/// without waiting for network idle.
const CONTENT_LOADED_SCRIPT: &str =
    "document.readyState !== 'loading' && location.href !== 'about:blank'";

/// How a session holds its browser.
enum BrowserLease {
    /// Launched for this session alone; closed with it
    Owned(LaunchedBrowser),
    /// Borrowed from a pool slot
    Pooled { pool: BrowserPool, slot: usize },
}

/// A page on a Chromium browser.
pub struct ChromiumSession {
    url: String,
    page: Option<Page>,
    lease: Option<BrowserLease>,
    lost: AtomicBool,
}

impl ChromiumSession {
    fn new(url: &str, page: Page, lease: BrowserLease) -> Self {
        Self {
            url: url.to_string(),
            page: Some(page),
            lease: Some(lease),
            lost: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl PageSession for ChromiumSession {
    fn url(&self) -> &str {
        &self.url
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| BrowserError::SessionLost("session already closed".to_string()))?;

        let result = page.evaluate(script).await.map_err(|e| {
            let err = classify_cdp_error(&e);
            if err.is_session_lost() {
                self.mark_lost();
            }
            err
        })?;

        result
            .into_value::<serde_json::Value>()
            .map_err(|e| BrowserError::Evaluation(format!("unreadable script result: {e}")))
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!(url = %self.url, "Page close failed: {}", e);
            }
        }

        match self.lease.take() {
            Some(BrowserLease::Owned(browser)) => browser.shutdown().await,
            Some(BrowserLease::Pooled { pool, slot }) => {
                if self.is_lost() {
                    pool.invalidate(slot).await;
                }
            }
            None => {}
        }
    }
}

/// Hands out Chromium sessions, pooled when `pool_size > 0`.
pub struct ChromiumSessionManager {
    config: BrowserConfig,
    pool: Option<BrowserPool>,
}

impl ChromiumSessionManager {
    /// Create a manager. Nothing is launched until the first session or
    /// [`ChromiumSessionManager::warm_up`].
    #[must_use]
    pub fn new(config: BrowserConfig) -> Self {
        let pool = (config.pool_size > 0)
            .then(|| BrowserPool::new(config.pool_size, config.clone()));
        Self { config, pool }
    }

    /// The browser pool, if pooling is enabled.
    #[must_use]
    pub fn pool(&self) -> Option<&BrowserPool> {
        self.pool.as_ref()
    }

    /// Pre-launch every pooled browser. Does nothing without a pool.
    pub async fn warm_up(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => pool.warm_up().await,
            None => Ok(()),
        }
    }

    /// Close pooled browsers. Single-use browsers close with their sessions.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }

    async fn open_page(&self) -> Result<(Page, BrowserLease)> {
        if let Some(pool) = &self.pool {
            let (page, slot) = pool.checkout_page().await?;
            return Ok((
                page,
                BrowserLease::Pooled {
                    pool: pool.clone(),
                    slot,
                },
            ));
        }

        let browser = launcher::launch(&self.config).await?;
        match browser.browser().new_page("about:blank").await {
            Ok(page) => Ok((page, BrowserLease::Owned(browser))),
            Err(e) => {
                browser.shutdown().await;
                Err(BrowserError::LaunchFailure(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionProvider for ChromiumSessionManager {
    async fn acquire(&self, url: &str, profile: NavigationProfile) -> Result<Box<dyn PageSession>> {
        validate_target_url(url)?;

        let (page, lease) = self.open_page().await?;
        let timeout = profile.timeout(&self.config);

        match navigate(&page, url, timeout).await {
            Ok(()) => {
                tracing::debug!(%url, "Session acquired");
                Ok(Box::new(ChromiumSession::new(url, page, lease)))
            }
            Err(err) => {
                let mut session = ChromiumSession::new(url, page, lease);
                if err.is_session_lost() {
                    session.mark_lost();
                }
                session.close().await;
                tracing::warn!(%url, "Navigation failed: {}", err);
                Err(err)
            }
        }
    }

    async fn release(&self, mut session: Box<dyn PageSession>) {
        let url = session.url().to_string();
        session.close().await;
        tracing::debug!(%url, "Session released");
    }
}

/// Navigate and wait for "content loaded" within `timeout`.
async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<()> {
    let navigation = async {
        let response = page
            .execute(NavigateParams::new(url.to_string()))
            .await
            .map_err(|e| navigation_error(url, &e))?;

        if let Some(error_text) = &response.result.error_text {
            return Err(BrowserError::NavigationFailure {
                url: url.to_string(),
                reason: error_text.clone(),
            });
        }

        loop {
            let ready = page
                .evaluate(CONTENT_LOADED_SCRIPT)
                .await
                .map_err(|e| navigation_error(url, &e))?
                .into_value::<bool>()
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
        }
    };

    tokio::time::timeout(timeout, navigation)
        .await
        .map_err(|_| BrowserError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        })?
}

fn navigation_error(url: &str, err: &chromiumoxide::error::CdpError) -> BrowserError {
    match classify_cdp_error(err) {
        lost @ BrowserError::SessionLost(_) => lost,
        other => BrowserError::NavigationFailure {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_enabled_by_size() {
        let manager = ChromiumSessionManager::new(BrowserConfig::default());
        assert!(manager.pool().is_none());

        let config = BrowserConfig {
            pool_size: 2,
            ..BrowserConfig::default()
        };
        let manager = ChromiumSessionManager::new(config);
        assert_eq!(manager.pool().map(BrowserPool::size), Some(2));
    }

    #[tokio::test]
    async fn test_warm_up_without_pool_launches_nothing() {
        let manager = ChromiumSessionManager::new(BrowserConfig::default());
        tokio_test::assert_ok!(manager.warm_up().await);
        assert!(manager.pool().is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_launch() {
        let manager = ChromiumSessionManager::new(BrowserConfig::default());
        let result = manager
            .acquire("file:///etc/passwd", NavigationProfile::Single)
            .await;
        assert!(matches!(result, Err(BrowserError::InvalidUrl { .. })));
    }
}
