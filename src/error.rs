//! Error types for the ingestion pipeline.
//!
//! Every failure the batch runner can recover from has its own variant so the
//! runner can decide, per file, whether to skip and continue:
//!
//! ```
//! use plata::error::EtlError;
//! use std::path::PathBuf;
//!
//! assert!(EtlError::Load("unreadable".to_owned()).is_file_local());
//! assert!(!EtlError::InputDirMissing(PathBuf::from("input")).is_file_local());
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error converts
//! into [`EtlError`]:
//!
//! ```no_run
//! use plata::error::ResultExt as _;
//!
//! fn read_extract(path: &str) -> plata::error::Result<Vec<u8>> {
//!     std::fs::read(path).context("Failed to read extract")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for pipeline operations.
#[derive(Debug)]
pub enum EtlError {
    /// I/O errors outside of extract loading (output files, directories)
    Io(std::io::Error),

    /// Extract missing, unreadable or undecodable
    Load(String),

    /// Required columns absent after header normalization
    Schema {
        file: String,
        missing: Vec<String>,
        present: Vec<String>,
    },

    /// Store unreachable or transaction failure
    Persistence(String),

    /// Cards were about to be filtered against a customer set that was not
    /// re-read from the store after the last change
    StaleCustomerSet { version: u64 },

    /// The input directory does not exist
    InputDirMissing(PathBuf),

    /// Configuration errors
    Config(String),

    /// Output serialization errors
    Output(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Load(msg) => write!(f, "Load error: {msg}"),
            Self::Schema {
                file,
                missing,
                present,
            } => write!(
                f,
                "Schema error: {file} is missing required columns {missing:?} (present: {present:?})"
            ),
            Self::Persistence(msg) => write!(f, "Persistence error: {msg}"),
            Self::StaleCustomerSet { version } => write!(
                f,
                "Known customer set (version {version}) has not been refreshed from the store"
            ),
            Self::InputDirMissing(path) => {
                write!(f, "Input directory does not exist: {}", path.display())
            }
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Output(msg) => write!(f, "Output error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EtlError {}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        Self::Load(err.to_string())
    }
}

impl From<polars::error::PolarsError> for EtlError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::Output(err.to_string())
    }
}

impl From<sqlx::Error> for EtlError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EtlError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(f()))
    }
}

impl EtlError {
    /// Prefixes the message while keeping the variant, so callers can still
    /// tell a load failure from a persistence failure after adding context.
    fn with_prefix(self, prefix: String) -> Self {
        match self {
            Self::Load(msg) => Self::Load(format!("{prefix}: {msg}")),
            Self::Persistence(msg) => Self::Persistence(format!("{prefix}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{prefix}: {msg}")),
            Self::Output(msg) => Self::Output(format!("{prefix}: {msg}")),
            Self::Other(msg) => Self::Other(format!("{prefix}: {msg}")),
            other => Self::Other(format!("{prefix}: {other}")),
        }
    }

    /// Whether the batch may continue with the next file after this error.
    pub fn is_file_local(&self) -> bool {
        !matches!(self, Self::InputDirMissing(_) | Self::Config(_))
    }
}
