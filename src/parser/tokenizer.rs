//! Quoted-CSV tokenizer for pasted spreadsheet text
//!
//! Produces a matrix of raw cells. Cells are not cleaned here; the header
//! resolver and row normalizer do that so the matrix stays a faithful view
//! of the input.

use crate::{ImportError, Result};

/// One tokenized record and the physical line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    /// 1-based line number of the record's first character
    pub line: usize,
    pub cells: Vec<String>,
}

impl MatrixRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Rows of raw cells, blank records already removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    pub rows: Vec<MatrixRow>,
}

impl Matrix {
    pub fn new(rows: Vec<MatrixRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Widest row, used for positional mappings
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }
}

/// Tokenize comma-separated text with RFC 4180 quoting
///
/// Accepts `\n`, `\r\n` and bare `\r` record separators. A quoted field may
/// span lines and keeps its line breaks verbatim; `""` inside quotes is one
/// literal quote.
///
/// # Errors
///
/// [`ImportError::TabSeparated`] when the text has tabs but no commas, and
/// [`ImportError::UnterminatedQuote`] when a quote is never closed.
pub fn tokenize(text: &str) -> Result<Matrix> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if text.contains('\t') && !text.contains(',') {
        return Err(ImportError::TabSeparated);
    }

    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\r' => {
                    field.push(ch);
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                        field.push('\n');
                    }
                    line += 1;
                }
                '\n' => {
                    field.push(ch);
                    line += 1;
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => cells.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                cells.push(std::mem::take(&mut field));
                rows.push(MatrixRow::new(row_line, std::mem::take(&mut cells)));
                line += 1;
                row_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(ImportError::UnterminatedQuote { line: quote_line });
    }

    if !field.is_empty() || !cells.is_empty() {
        cells.push(field);
        rows.push(MatrixRow::new(row_line, cells));
    }

    rows.retain(|row| !row.is_blank());
    Ok(Matrix::new(rows))
}
