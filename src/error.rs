//! Error types for the import pipeline

use thiserror::Error;

use crate::storage::StorageError;
use crate::validate::FieldErrors;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Import pipeline errors
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Namespace '{0}' is forbidden")]
    InvalidNamespace(String),

    #[error("File type must be json or zip, got '{0}'")]
    UnsupportedFileType(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Malformed archive entry {path}: {reason}")]
    MalformedArchiveEntry { path: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(FieldErrors),

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::MalformedInput(err.to_string())
    }
}

impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        ImportError::MalformedInput(format!("unreadable archive: {}", err))
    }
}

impl ImportError {
    /// Field-level errors, if this is a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ImportError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}
