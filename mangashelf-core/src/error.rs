use std::path::PathBuf;

use mangashelf_model::ModelError;
use thiserror::Error;

use crate::fs::{FsError, FsErrorKind};

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cannot render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid manga metadata: {0}")]
    Metadata(#[from] ModelError),

    #[error("Filesystem error: {0}")]
    Fs(FsError),
}

impl ShelfError {
    /// True for failures the user can fix by granting access and retrying.
    pub fn is_permission(&self) -> bool {
        matches!(self, ShelfError::PermissionDenied { .. })
    }
}

impl From<FsError> for ShelfError {
    fn from(err: FsError) -> Self {
        match err.kind {
            FsErrorKind::PermissionDenied => {
                ShelfError::PermissionDenied { path: err.path }
            }
            FsErrorKind::NotFound => ShelfError::NotFound { path: err.path },
            _ => ShelfError::Fs(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
