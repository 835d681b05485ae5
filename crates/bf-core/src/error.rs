//! Unified error type for batchforge.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Unified error type covering all failure modes in batchforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "runner", "extension").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The worklist could not be built from the requested source.
    #[error("Entry generation failed for {}: {message}", path.display())]
    Generation {
        /// The directory (or other source) that could not be listed.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// An extension manifest could not be read or parsed.
    #[error("Manifest error [{}]: {message}", path.display())]
    Manifest {
        /// Path of the offending manifest.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, etc.) returned an error or is missing.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The operation was stopped before it completed.
    #[error("Cancelled")]
    Cancelled,

    /// One or more entries of a batch failed.
    #[error("Batch failed: {failed} of {amount} entries failed")]
    Batch {
        /// Number of entries whose execution failed.
        failed: usize,
        /// Total worklist length.
        amount: usize,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Generation { .. } => 422,
            Error::Manifest { .. } => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Cancelled => 409,
            Error::Batch { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Generation`].
    pub fn generation(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Error::Generation {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Manifest`].
    pub fn manifest(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Error::Manifest {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
