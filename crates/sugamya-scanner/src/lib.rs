//! Sugamya Scanner - scan orchestration, job admission and graceful shutdown.
//!
//! This crate wires the browser session manager, the checker set and the
//! persistence layer into a background scan pipeline.
//!
//! # Features
//!
//! - One page session per scan, shared by all checkers and always released
//! - Concurrent checkers whose failures never abort their siblings
//! - Typed failure classification stored on every failed scan
//! - Bounded job queue with a fixed worker pool and multi-page batches
//! - Drain on shutdown with a hard ceiling
//!
//! # Example
//!
//! ```rust,ignore
//! use sugamya_scanner::{CheckerSet, JobQueue, ScanCoordinator, ScanOrchestrator};
//! use std::sync::Arc;
//!
//! let coordinator = ScanCoordinator::new();
//! let orchestrator = Arc::new(ScanOrchestrator::new(
//!     Arc::new(session_manager),
//!     store.clone(),
//!     CheckerSet::from_config(&config.checkers)?,
//!     coordinator,
//! ));
//! let queue = JobQueue::start(orchestrator, store, discovery, &config.scanning);
//!
//! let scan_id = queue.submit("site-1", "https://example.gov.in/").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod coordinator;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod service;

pub use coordinator::{DrainReport, InFlightGuard, ScanCoordinator};
pub use error::{Result, ScanError};
pub use orchestrator::{CheckerSet, ScanOrchestrator, SettledScan};
pub use queue::{BatchSubmission, JobQueue};
pub use service::ReportService;
