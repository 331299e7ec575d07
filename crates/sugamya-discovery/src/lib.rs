//! Sugamya Discovery - finds the pages of a site for a batch scan.
//!
//! Discovery never fails from the caller's point of view: when the sitemap
//! cannot be fetched or is empty, the site URL itself is the only page.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod sitemap;

pub use error::{DiscoveryError, Result};
pub use sitemap::SitemapDiscovery;

/// Source of page URLs for a site.
#[async_trait::async_trait]
pub trait UrlDiscovery: Send + Sync {
    /// Page URLs for `site_url`, capped and never empty.
    async fn fetch_page_urls(&self, site_url: &str) -> Vec<String>;
}
