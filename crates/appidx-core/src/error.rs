//! Error types for appidx core operations.
//!
//! Library code returns [`IndexError`] through the crate-wide [`Result`]
//! alias; the command-line front end wraps these in `anyhow`.
//!
//! Errors fall into three families:
//!
//! - **Input errors** come from individual metadata files and are reported
//!   per file (the file is skipped unless the build runs in strict mode).
//! - **Build defects** (`Internal`, `CapacityExceeded`) abort a build.
//! - **Open errors** (`Corrupted`, `VersionMismatch`) are raised once when a
//!   buffer is opened; a successfully opened index never errors afterwards.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using IndexError
pub type Result<T> = std::result::Result<T, IndexError>;

/// Core error types for appidx operations.
#[derive(Error, Debug)]
pub enum IndexError {
    // === Input Errors ===
    /// A metadata file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A metadata file contains a malformed line
    #[error("{file}:{line}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    // === Build Errors ===
    /// A string list or id list exceeded the 16-bit id space
    #[error("{what} exceeds format limit: {count} > {limit}")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    /// Internal consistency violation while building; never caused by input
    #[error("internal error: {0}")]
    Internal(String),

    // === Open Errors ===
    /// The index file is missing
    #[error("index not found at {path}")]
    IndexNotFound { path: PathBuf },

    /// The buffer failed validation at open time
    #[error("index is corrupted: {reason}")]
    Corrupted { reason: String },

    /// The buffer was written by an incompatible format version
    #[error("index version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Returns true if this error concerns a single input file.
    ///
    /// Input errors are skipped by a lenient build; everything else aborts.
    pub fn is_input_error(&self) -> bool {
        matches!(self, IndexError::Read { .. } | IndexError::Parse { .. })
    }

    /// Returns true if the on-disk index must be rebuilt.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            IndexError::IndexNotFound { .. }
                | IndexError::Corrupted { .. }
                | IndexError::VersionMismatch { .. }
        )
    }

    /// Create a parse error for `file` at 1-based `line`
    pub fn parse(file: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        IndexError::Parse {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create an open-time corruption error
    pub fn corrupted(reason: impl Into<String>) -> Self {
        IndexError::Corrupted {
            reason: reason.into(),
        }
    }

    /// Create an internal build error
    pub fn internal(reason: impl Into<String>) -> Self {
        IndexError::Internal(reason.into())
    }
}
