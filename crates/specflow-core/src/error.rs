//! Error types for Specflow.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur across the coordination and specification layers.
///
/// Components never retry internally; they return one of these variants and
/// let the caller decide. Only the recovery manager is permitted to rewrite
/// another component's state in response to `Corruption` or `Staleness`.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema, referential, or enumeration violation in a document.
    #[error("validation failed: {message}")]
    Validation {
        /// What failed and where.
        message: String,
    },

    /// A named specification or status record does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Name of the missing entity.
        what: String,
    },

    /// Overwrite attempted without the explicit force flag.
    #[error("conflict: {message}")]
    Conflict {
        /// Why the operation was refused.
        message: String,
    },

    /// An on-disk record is unparseable.
    #[error("corrupt record at {path}: {message}")]
    Corruption {
        /// Path to the unparseable file.
        path: PathBuf,
        /// Parse failure detail.
        message: String,
    },

    /// An in-progress record has exceeded the staleness threshold.
    #[error("stale record for '{subject}': in_progress for {age_secs}s")]
    Staleness {
        /// Subject of the stale record.
        subject: String,
        /// Age of the record in seconds.
        age_secs: u64,
    },

    /// Underlying filesystem operation failed.
    #[error("I/O failure at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// The originating I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a corruption error for a file.
    pub fn corruption(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corruption {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred at.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Machine-readable error kind, reported by the command surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Corruption { .. } => "corruption",
            Self::Staleness { .. } => "staleness",
            Self::Io { .. } => "io_failure",
        }
    }

    /// Whether the caller can fix its input and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound { .. } | Self::Conflict { .. }
        )
    }
}

/// Result type alias using Specflow's Error.
pub type Result<T> = std::result::Result<T, Error>;
