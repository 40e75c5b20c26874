//! Error handling for import operations.
//!
//! Provides error types with context for format problems in pasted or
//! uploaded data, validation outcomes that block an import, and store
//! failures raised while reconciling.

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Reconciliation phase, used to tag store failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Rtos,
    Qualifications,
    Units,
    Offers,
    UnitLinks,
    Streams,
    StreamLinks,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Rtos => "rto",
            Phase::Qualifications => "qualification",
            Phase::Units => "unit",
            Phase::Offers => "offer",
            Phase::UnitLinks => "unit link",
            Phase::Streams => "stream",
            Phase::StreamLinks => "stream link",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tab-separated data detected, expected CSV")]
    TabSeparated,

    #[error("Unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("Validation failed: {count} row error(s)")]
    ValidationFailed { count: usize },

    #[error("No importable rows: {rows} parsed, {invalid} invalid")]
    NoImportableRows { rows: usize, invalid: usize },

    #[error("{phase} phase failed: {source}")]
    Store {
        phase: Phase,
        #[source]
        source: StoreError,
    },

    #[error("Blob not found: {bucket}/{path}")]
    BlobNotFound { bucket: String, path: String },

    #[error("Invalid blob path: {path}")]
    InvalidBlobPath { path: String },

    #[error("Import function answered with status {status}")]
    FunctionStatus { status: u16 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl ImportError {
    /// Tag a store failure with the phase that issued the call
    pub fn store(phase: Phase, source: StoreError) -> Self {
        Self::Store { phase, source }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an interrupted error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Format errors block an import before any normalization happens
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ImportError::TabSeparated | ImportError::UnterminatedQuote { .. } | ImportError::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_names_phase() {
        let err = ImportError::store(
            Phase::UnitLinks,
            StoreError::query("qualification_units upsert", "connection reset"),
        );
        assert_eq!(
            err.to_string(),
            "unit link phase failed: qualification_units upsert: connection reset"
        );
    }

    #[test]
    fn test_format_errors() {
        assert!(ImportError::TabSeparated.is_format_error());
        assert!(ImportError::UnterminatedQuote { line: 3 }.is_format_error());
        assert!(!ImportError::configuration("x").is_format_error());
    }
}
