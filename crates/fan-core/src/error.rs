use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by Fan Analytics.
#[derive(Error, Debug)]
pub enum FanError {
    /// A submitted field was missing or outside its allowed range.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A string did not match any label of a closed-choice field.
    #[error("Unknown {kind}: {value}")]
    UnknownLabel { kind: &'static str, value: String },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A timestamp string did not match the persisted format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// Another writer currently holds the record file lock.
    #[error("Record store is locked by another writer: {0} (delete the file if no writer is running)")]
    StoreLocked(PathBuf),

    /// An export was requested for an empty record subset.
    #[error("Nothing to export: the selected subset is empty")]
    NothingToExport,

    /// Rendering an export (CSV / JSON) failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FanError {
    /// Shorthand for a [`FanError::Validation`] error.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        FanError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the fan analytics crates.
pub type Result<T> = std::result::Result<T, FanError>;
