//! `sitemap.xml` discovery.

use crate::error::{DiscoveryError, Result};
use crate::UrlDiscovery;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use sugamya_core::ScanningConfig;
use url::Url;

/// Child sitemaps followed from a sitemap index.
const MAX_CHILD_SITEMAPS: usize = 10;

fn loc_regex() -> &'static Regex {
    static LOC_REGEX: OnceLock<Regex> = OnceLock::new();
    LOC_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<loc>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</loc>")
            .expect("valid regex")
    })
}

/// Every `<loc>` value in document order, entity-decoded.
fn extract_locs(xml: &str) -> Vec<String> {
    loc_regex()
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .replace("&amp;", "&")
                .replace("&apos;", "'")
                .replace("&quot;", "\"")
                .replace("&lt;", "<")
                .replace("&gt;", ">")
        })
        .filter(|loc| !loc.is_empty())
        .collect()
}

fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

/// Keep same-host `http(s)` URLs, drop fragments and duplicates, cap at `max`.
fn filter_urls(
    site: &Url,
    candidates: impl IntoIterator<Item = String>,
    max: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for candidate in candidates {
        if pages.len() >= max {
            break;
        }
        let Ok(mut url) = Url::parse(&candidate) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") || url.host_str() != site.host_str() {
            continue;
        }
        url.set_fragment(None);
        let url = url.to_string();
        if seen.insert(url.clone()) {
            pages.push(url);
        }
    }

    pages
}

/// Reads `/sitemap.xml`, following one level of sitemap index.
#[derive(Debug, Clone)]
pub struct SitemapDiscovery {
    client: Client,
    max_pages: usize,
}

impl SitemapDiscovery {
    /// Build from scanning config (timeout, user agent, page cap).
    pub fn new(config: &ScanningConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.discovery_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DiscoveryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_pages: config.max_batch_pages,
        })
    }

    /// Maximum number of pages returned.
    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Discover pages, surfacing errors instead of falling back.
    pub async fn discover(&self, site_url: &str) -> Result<Vec<String>> {
        let site = Url::parse(site_url).map_err(|e| DiscoveryError::InvalidUrl {
            url: site_url.to_string(),
            reason: e.to_string(),
        })?;
        let sitemap_url = site.join("/sitemap.xml").map_err(|e| DiscoveryError::InvalidUrl {
            url: site_url.to_string(),
            reason: e.to_string(),
        })?;

        let root = self.fetch_text(&sitemap_url).await?;
        if !is_sitemap_index(&root) {
            return Ok(filter_urls(&site, extract_locs(&root), self.max_pages));
        }

        let mut candidates = Vec::new();
        for child in extract_locs(&root).into_iter().take(MAX_CHILD_SITEMAPS) {
            if candidates.len() >= self.max_pages {
                break;
            }
            let Ok(child_url) = Url::parse(&child) else {
                continue;
            };
            match self.fetch_text(&child_url).await {
                Ok(xml) => candidates.extend(extract_locs(&xml)),
                Err(e) => tracing::debug!(sitemap = %child_url, "Skipping child sitemap: {}", e),
            }
        }
        Ok(filter_urls(&site, candidates, self.max_pages))
    }
}

#[async_trait::async_trait]
impl UrlDiscovery for SitemapDiscovery {
    async fn fetch_page_urls(&self, site_url: &str) -> Vec<String> {
        match self.discover(site_url).await {
            Ok(pages) if !pages.is_empty() => {
                tracing::info!(site = site_url, pages = pages.len(), "Sitemap pages discovered");
                pages
            }
            Ok(_) => {
                tracing::info!(site = site_url, "Sitemap empty, scanning site URL only");
                vec![site_url.to_string()]
            }
            Err(e) => {
                tracing::warn!(
                    site = site_url,
                    "Sitemap unavailable, scanning site URL only: {}",
                    e
                );
                vec![site_url.to_string()]
            }
        }
    }
}
