//! Error types for file reconciliation.
//!
//! Only failures that must reach the caller are represented here. A missing
//! file is not an error (it is the Absent state), and content drift is not an
//! error (it is reported as an empty [`Identity`](crate::Identity)).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Categories of filesystem errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The path does not exist
    NotFound,
    /// Permission denied on the path or one of its ancestors
    Permission,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Classify an I/O error kind.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Permission,
            _ => Self::Other,
        }
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Path not found",
            Self::Permission => "Permission denied",
            Self::Other => "Unexpected I/O error",
        }
    }
}

/// Errors that can occur while reconciling a file.
///
/// Every variant carries the path that failed and the underlying I/O error.
#[derive(Debug, Error)]
pub enum Error {
    /// Stat of the target path failed for a reason other than absence
    #[error("failed to stat {path}: {source}")]
    Stat {
        /// Path that could not be inspected
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The target exists but its content could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The parent directory could not be created
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The content could not be written to the target
    #[error("failed to write {path}: {source}")]
    Write {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// The path the failed operation was acting on.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Stat { path, .. }
            | Self::Read { path, .. }
            | Self::CreateDir { path, .. }
            | Self::Write { path, .. } => path,
        }
    }

    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Stat { source, .. }
            | Self::Read { source, .. }
            | Self::CreateDir { source, .. }
            | Self::Write { source, .. } => source,
        }
    }

    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_io(self.io_error())
    }

    /// Returns true if the underlying failure was a missing path.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;
