//! Errors raised by the domain model and by configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// A domain value that failed to parse or validate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SugamyaError {
    /// Scan ids are UUID v4 strings
    #[error("invalid scan id '{0}': expected a UUID v4")]
    InvalidScanId(String),

    /// Severity outside critical, serious, moderate and minor
    #[error("unknown severity '{0}'")]
    UnknownSeverity(String),

    /// Not one of the scan lifecycle states
    #[error("unknown scan status '{0}'")]
    UnknownStatus(String),
}

/// Why configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No home directory to derive the XDG paths from
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// An explicitly requested config file does not exist
    #[error("config file not found at {}", path.display())]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// The file exists but could not be read
    #[error("could not read {}: {source}", path.display())]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`crate::AppConfig`]
    #[error("could not parse {}: {source}", path.display())]
    Parse {
        /// Config file
        path: PathBuf,
        /// Parser error, with line and column
        #[source]
        source: toml::de::Error,
    },

    /// A value the scanner cannot run with
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field name, e.g. `scanning.workers`
        field: &'static str,
        /// What the value must satisfy
        reason: &'static str,
    },
}

/// Result type alias for domain value parsing.
pub type Result<T> = std::result::Result<T, SugamyaError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
