//! Pipeline error taxonomy
//!
//! - [`BackendError`]: the rendering backend failed. Fatal for the run.
//! - [`ConflictError`]: a publish target is real content. Fatal for that one
//!   model's publish step only.
//! - [`FilesystemError`]: the catalog or an output tree could not be read or
//!   written. Fatal.
//! - [`ConfigError`]: configuration could not be loaded or is invalid.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use crate::backend::BackendError;
pub use crate::config::ConfigError;
pub use crate::publish::{ConflictError, PublishError};

/// Filesystem failures outside the backend
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// A directory the pipeline must enumerate does not exist
    #[error("Directory '{0}' does not exist")]
    MissingDirectory(PathBuf),

    /// An I/O operation on a path failed
    #[error("Failed to {operation} '{path}': {source}")]
    Io {
        /// What the pipeline was doing
        operation: &'static str,
        /// Path the operation touched
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl FilesystemError {
    /// Wrap an I/O error with the operation and path it happened on
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Top-level error of a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Publish conflict surfaced outside the per-model publish loop
    #[error("Publish conflict: {0}")]
    Conflict(#[from] ConflictError),
}

impl From<PublishError> for PipelineError {
    fn from(error: PublishError) -> Self {
        match error {
            PublishError::Conflict(conflict) => Self::Conflict(conflict),
            PublishError::Filesystem(fs) => Self::Filesystem(fs),
        }
    }
}

/// Result alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
