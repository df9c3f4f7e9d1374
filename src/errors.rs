//! Error types for the pilltrack application.
//!
//! Validation failures are reported back to the user and leave state untouched.
//! Everything else belongs to the storage family and propagates up to `main`.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the pilltrack application.
#[derive(Error, Debug)]
pub enum PillError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A form field was blank or the quantity was not a positive number.
    #[error("{message}")]
    Validation { message: String },

    /// A background store write failed or never completed.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Record was not found when the CLI looked it up by id.
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },
}

impl PillError {
    pub fn validation(message: impl Into<String>) -> Self {
        PillError::Validation {
            message: message.into(),
        }
    }

    /// True for errors that should be shown to the user rather than aborting.
    pub fn is_validation(&self) -> bool {
        matches!(self, PillError::Validation { .. })
    }
}
