//! Configuration management for Sugamya.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/sugamya/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Job admission and worker pool settings
    pub scanning: ScanningConfig,
    /// Checker settings
    pub checkers: CheckerConfig,
    /// Graceful shutdown settings
    pub shutdown: ShutdownConfig,
    /// Database and report locations
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SUGAMYA_*` environment overrides in place.
    ///
    /// - `SUGAMYA_HEADLESS`: browser headless mode (true/false)
    /// - `SUGAMYA_POOL_SIZE`: browser pool size (0 disables pooling)
    /// - `SUGAMYA_WORKERS`: number of scan workers
    /// - `SUGAMYA_DATABASE`: database path
    /// - `SUGAMYA_LIGHTHOUSE`: Lighthouse binary
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("SUGAMYA_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("SUGAMYA_POOL_SIZE") {
            if let Ok(size) = val.parse() {
                self.browser.pool_size = size;
                tracing::debug!("Override browser.pool_size from env: {}", size);
            }
        }

        if let Ok(val) = std::env::var("SUGAMYA_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.scanning.workers = workers;
                tracing::debug!("Override scanning.workers from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("SUGAMYA_DATABASE") {
            tracing::debug!("Override storage.database_path from env: {}", val);
            self.storage.database_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("SUGAMYA_LIGHTHOUSE") {
            tracing::debug!("Override checkers.lighthouse_binary from env: {}", val);
            self.checkers.lighthouse_binary = val;
        }
    }

    /// Reject values the scanner cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scanning.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.workers",
                reason: "must be at least 1",
            });
        }
        if self.scanning.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.queue_capacity",
                reason: "must be at least 1",
            });
        }
        if self.scanning.max_batch_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.max_batch_pages",
                reason: "must be at least 1",
            });
        }
        if self.shutdown.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "shutdown.poll_interval_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/sugamya/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/sugamya`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Database file to open: the configured path or `<data_dir>/sugamya.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("sugamya.db")),
        }
    }

    /// Directory rendered reports are written to: configured or `<data_dir>/reports`.
    pub fn reports_dir(&self) -> ConfigResult<PathBuf> {
        match &self.storage.reports_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("reports")),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("org", "sugamya", "sugamya").ok_or(ConfigError::NoConfigDir)
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Chrome/Chromium executable; auto-detected when unset
    pub executable: Option<PathBuf>,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout for single-page scans, in seconds
    pub navigation_timeout_secs: u64,
    /// Navigation timeout for pages of a batch scan, in seconds
    pub batch_navigation_timeout_secs: u64,
    /// Number of pre-launched browsers; 0 launches one browser per session
    pub pool_size: usize,
    /// Extra command-line arguments passed to the browser
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1366,
            window_height: 768,
            navigation_timeout_secs: 60,
            batch_navigation_timeout_secs: 20,
            pool_size: 0,
            args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
        }
    }
}

/// Job admission and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Number of worker tasks running scans concurrently
    pub workers: usize,
    /// Maximum number of queued jobs before submissions are refused
    pub queue_capacity: usize,
    /// Upper bound on pages discovered for one batch scan
    pub max_batch_pages: usize,
    /// Timeout for sitemap requests, in seconds
    pub discovery_timeout_secs: u64,
    /// User agent for discovery requests
    pub user_agent: String,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 256,
            max_batch_pages: 50,
            discovery_timeout_secs: 15,
            user_agent: "Sugamya/0.1.0 (+https://github.com/sugamya/sugamya)".to_string(),
        }
    }
}

/// Checker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Local copy of `axe.min.js`; when unset the script is loaded from `axe_cdn_url`
    pub axe_script_path: Option<PathBuf>,
    /// CDN location of axe-core
    pub axe_cdn_url: String,
    /// Lighthouse executable
    pub lighthouse_binary: String,
    /// Time budget for one Lighthouse run, in seconds
    pub score_timeout_secs: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            axe_script_path: None,
            axe_cdn_url: "https://cdnjs.cloudflare.com/ajax/libs/axe-core/4.8.2/axe.min.js"
                .to_string(),
            lighthouse_binary: "lighthouse".to_string(),
            score_timeout_secs: 120,
        }
    }
}

/// Graceful shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How often the drain loop re-checks the in-flight count, in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum time to wait for in-flight scans, in seconds
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            drain_timeout_secs: 60,
        }
    }
}

/// Database and report locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; defaults to `<data_dir>/sugamya.db`
    pub database_path: Option<PathBuf>,
    /// Report output directory; defaults to `<data_dir>/reports`
    pub reports_dir: Option<PathBuf>,
}
