//! Browser session management for accessibility audits.
//!
//! Provides single-use and pooled headless Chromium sessions bound to one
//! target URL, with bounded navigation and typed session-loss detection.

pub mod error;
pub mod launcher;
pub mod manager;
pub mod pool;
pub mod session;

pub use error::{BrowserError, Result};
pub use manager::ChromiumSessionManager;
pub use pool::BrowserPool;
pub use session::{validate_target_url, NavigationProfile, PageSession, SessionProvider};
