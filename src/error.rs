//! Error types for lotstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for lotstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    /// Key absent from an index when the operation requires it
    #[error("{table}: key not found: {key}")]
    NotFound { table: &'static str, key: String },

    /// A sale references a car that can no longer be resolved
    #[error("car not found: {0}")]
    CarNotFound(String),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    /// Malformed record or index data on disk (always fatal)
    #[error("corrupt data in {path} at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("record of {len} bytes exceeds slot width {width}")]
    RecordTooLong { len: usize, width: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub(crate) fn not_found(table: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            table,
            key: key.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// True for the not-found family of errors
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::CarNotFound(_))
    }
}
