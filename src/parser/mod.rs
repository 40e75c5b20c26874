//! Parsing of pasted grids and uploaded CSV files
//!
//! ## Architecture
//!
//! - [`tokenizer`] - Quoted CSV text into a matrix of raw cells
//! - [`upload`] - Uploaded file bytes into the same matrix via the `csv` crate
//! - [`header`] - Header row detection and column mapping
//! - [`record_parser`] - Row cleanup and coercion into [`ImportRecord`]s
//! - [`field_parsers`] - Cell cleanup, code, boolean, type and stream helpers
//!
//! ## Usage
//!
//! ```rust
//! use rto_importer::parser::{normalize_rows, resolve_headers, tokenize};
//!
//! # fn example() -> rto_importer::Result<()> {
//! let matrix = tokenize("Unit Code,Unit Name,Unit Type\nBSBOPS201,Work effectively,Core\n")?;
//! let resolution = resolve_headers(&matrix);
//! let records = normalize_rows(&matrix, &resolution);
//! assert_eq!(records[0].unit_code, "BSBOPS201");
//! # Ok(())
//! # }
//! ```
//!
//! [`ImportRecord`]: crate::models::ImportRecord

pub mod field_parsers;
pub mod header;
pub mod record_parser;
pub mod tokenizer;
pub mod upload;

#[cfg(test)]
pub mod tests;

pub use header::{ColumnMapping, HeaderMode, HeaderResolution, resolve_headers, resolve_with_headers};
pub use record_parser::{apply_defaults, normalize, normalize_rows};
pub use tokenizer::{Matrix, MatrixRow, tokenize};
pub use upload::parse_upload;
