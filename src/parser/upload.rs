//! Uploaded CSV file parsing
//!
//! Files go through the `csv` crate rather than the paste tokenizer, but land
//! in the same [`Matrix`] so header resolution and normalization are shared.

use super::tokenizer::{Matrix, MatrixRow};
use crate::{ImportError, Result};
use csv::ReaderBuilder;
use tracing::debug;

/// Parse uploaded CSV bytes into a matrix of raw cells
pub fn parse_upload(bytes: &[u8]) -> Result<Matrix> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

    if bytes.contains(&b'\t') && !bytes.contains(&b',') {
        return Err(ImportError::TabSeparated);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 1);
        let row = MatrixRow::new(line, record.iter().map(str::to_string).collect());
        if row.cells.iter().any(|c| !c.trim().is_empty()) {
            rows.push(row);
        }
    }

    debug!("Parsed {} non-blank rows from uploaded file", rows.len());
    Ok(Matrix::new(rows))
}
