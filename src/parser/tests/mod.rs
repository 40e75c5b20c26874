//! Test utilities for the paste and upload parsers

use super::tokenizer::Matrix;

mod header_tests;

/// Quote every cell and join rows with the given line ending
pub fn encode_csv(rows: &[Vec<&str>], line_ending: &str) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(line_ending)
}

/// Cells of every row, without line numbers
pub fn cells(matrix: &Matrix) -> Vec<Vec<String>> {
    matrix.rows.iter().map(|r| r.cells.clone()).collect()
}

/// Header plus one core unit, the smallest importable paste
pub const MINIMAL_CSV: &str = "qualification_code,qualification_name,unit_code,unit_name,unit_description,unit_type\n\
BSB30120,Certificate III in Business,BSBCRT311,Apply critical thinking,Critical thinking skills,Core\n";
