use crate::error::{BrowserError, Result};
use std::time::Duration;
use sugamya_core::BrowserConfig;

/// Which navigation budget a session gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationProfile {
    /// A stand-alone page scan; favours completeness
    Single,
    /// One page of a sitemap batch; favours throughput
    Batch,
}

impl NavigationProfile {
    /// Navigation timeout this profile uses under `config`.
    #[must_use]
    pub fn timeout(self, config: &BrowserConfig) -> Duration {
        match self {
            Self::Single => Duration::from_secs(config.navigation_timeout_secs),
            Self::Batch => Duration::from_secs(config.batch_navigation_timeout_secs),
        }
    }
}

/// One browser page bound to a single target URL.
///
/// Held exclusively by one scan. `close` must be safe to call more than once
/// and must never fail.
#[async_trait::async_trait]
pub trait PageSession: Send + Sync {
    /// URL the session navigated to
    fn url(&self) -> &str;

    /// Evaluate a script in the page and return its JSON value.
    ///
    /// Promises are awaited.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Whether the page or its browser has been detected as gone
    fn is_lost(&self) -> bool;

    /// Record that the page or its browser is gone
    fn mark_lost(&self);

    /// Close the page, and the browser too when it is unrecoverable
    async fn close(&mut self);
}

/// Acquires and releases page sessions.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a page and navigate it to `url` within the profile's budget.
    async fn acquire(&self, url: &str, profile: NavigationProfile) -> Result<Box<dyn PageSession>>;

    /// Release a session. Never fails.
    async fn release(&self, mut session: Box<dyn PageSession>) {
        session.close().await;
    }
}

/// Check that `url` is an absolute `http`/`https` URL with a host.
pub fn validate_target_url(url: &str) -> Result<url::Url> {
    let invalid = |reason: &str| BrowserError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid("must start with http:// or https://"));
    }

    let parsed = url::Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(invalid("no host in URL"));
    }
    Ok(parsed)
}
