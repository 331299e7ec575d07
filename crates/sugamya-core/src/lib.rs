//! Sugamya Core - Foundation crate for the Sugamya accessibility scanner.
//!
//! This crate provides the domain model shared by the session manager, the
//! checkers, the orchestrator and the report engine, together with error
//! handling and configuration management.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Scan jobs, scan records, issues, severities and diagnostics
//!
//! # Example
//!
//! ```rust
//! use sugamya_core::{AppConfig, ScanStatus};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.browser.navigation_timeout_secs, 60);
//! assert!(ScanStatus::Queued.can_transition_to(ScanStatus::Processing));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CheckerConfig, ScanningConfig, ShutdownConfig, StorageConfig,
};
pub use error::{ConfigError, ConfigResult, Result, SugamyaError};
pub use types::{
    CheckerFailure, ComplianceResult, ComplianceViolation, Diagnostics, FailureReason, Issue,
    NewScan, RuleViolation, ScanFailure, ScanId, ScanJob, ScanRecord, ScanStatus, Severity,
};
