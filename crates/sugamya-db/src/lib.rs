//! Sugamya Database Layer
//!
//! `SQLite` persistence for scan records and their issues, using `SQLx` with
//! embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use sugamya_db::{Database, ScanStore};
//!
//! let db = Database::new("sugamya.db").await?;
//! db.run_migrations().await?;
//! let scan = db.create_scan(NewScan::single("site", "https://example.com")).await?;
//! ```
//!
//! The pipeline talks to storage only through [`ScanStore`], so tests and
//! other backends can substitute their own implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod scans;
pub mod store;

pub use error::{DatabaseError, Result};
pub use store::ScanStore;

use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Database handle: a connection pool plus migrations.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (or create) the database at `path`. Use `:memory:` for tests.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Number of the latest applied migration.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// The underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
