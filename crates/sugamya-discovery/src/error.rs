//! Discovery error types.

use thiserror::Error;

/// Errors raised while reading a sitemap. Callers of
/// [`UrlDiscovery`](crate::UrlDiscovery) only see them in logs.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The site URL could not be parsed.
    #[error("invalid site URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as given
        url: String,
        /// Parser message
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// Status code
        status: u16,
    },
}

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
