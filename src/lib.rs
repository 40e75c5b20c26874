//! RTO Importer Library
//!
//! Imports vocational-training qualification data from pasted spreadsheet
//! grids and uploaded CSV files into a relational record store.
//!
//! This library provides tools for:
//! - Tokenizing quoted CSV text, with heuristic header detection and a
//!   positional fallback
//! - Normalizing rows into qualification, unit, stream and offer records
//! - Row-level validation with aggregate counts
//! - Batched, idempotent reconciliation of records against a [`RecordStore`]
//! - A serverless-style entry point importing files from blob storage
//!
//! [`RecordStore`]: store::RecordStore

pub mod blob;
pub mod config;
pub mod constants;
pub mod draft;
pub mod error;
pub mod function;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod reconciler;
pub mod store;
pub mod validation;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::ImportConfig;
pub use error::{ImportError, Phase, Result};
pub use models::{ImportRecord, RecordDefaults, UnitType};
pub use parser::{normalize_rows, resolve_headers, tokenize};
pub use pipeline::ImportPipeline;
pub use reconciler::{LinkScope, ReconcileOptions, ReconcileSummary, SaveMode, reconcile};
pub use validation::validate;
