//! Header detection and column mapping
//!
//! Pasted grids sometimes start with a header row and sometimes go straight
//! into unit data. The first row is treated as a header when at least one of
//! its cells matches a known synonym; otherwise a fixed positional layout is
//! assumed.

use super::field_parsers::clean;
use super::tokenizer::Matrix;
use crate::constants::{HEADER_SYNONYMS, POSITIONAL_FIELDS};
use crate::models::Field;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static header key pattern"));

/// How the column mapping was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// First row matched known column names
    Header,
    /// No header recognised, fixed column order
    Positional,
    /// Header list supplied by the caller
    Predefined,
}

/// Column index to canonical field mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<Option<Field>>,
    field_to_index: HashMap<Field, usize>,
}

impl ColumnMapping {
    /// Build from per-column fields; the first column claiming a field keeps it
    pub fn from_columns(columns: Vec<Option<Field>>) -> Self {
        let mut field_to_index = HashMap::new();
        let mut deduped = Vec::with_capacity(columns.len());

        for (index, field) in columns.into_iter().enumerate() {
            match field {
                Some(field) if field_to_index.contains_key(&field) => {
                    warn!(
                        "Column {} duplicates field '{}', keeping column {}",
                        index + 1,
                        field,
                        field_to_index[&field] + 1
                    );
                    deduped.push(None);
                }
                Some(field) => {
                    field_to_index.insert(field, index);
                    deduped.push(Some(field));
                }
                None => deduped.push(None),
            }
        }

        Self {
            columns: deduped,
            field_to_index,
        }
    }

    /// Fixed layout used when no header row is found
    pub fn positional() -> Self {
        Self::from_columns(POSITIONAL_FIELDS.iter().copied().map(Some).collect())
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.field_to_index.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.field_to_index.contains_key(&field)
    }

    /// Field assigned to a column, if any
    pub fn field_at(&self, index: usize) -> Option<Field> {
        self.columns.get(index).copied().flatten()
    }

    /// Mapped fields in column order
    pub fn fields(&self) -> Vec<Field> {
        self.columns.iter().filter_map(|f| *f).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.field_to_index.is_empty()
    }
}

/// Result of header detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderResolution {
    pub mode: HeaderMode,
    pub mapping: ColumnMapping,
    /// Index of the first data row in the matrix
    pub data_start: usize,
}

/// Normalise a header cell into a lookup key
///
/// `"Unit Code "` becomes `unit_code`, `"Catégorie"` becomes `categorie`.
pub fn header_key(raw: &str) -> String {
    let stripped: String = clean(raw)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    NON_ALPHANUMERIC
        .replace_all(&stripped, "_")
        .trim_matches('_')
        .to_string()
}

/// Canonical field for a header cell, if it is a known synonym
pub fn lookup_field(raw: &str) -> Option<Field> {
    let key = header_key(raw);
    HEADER_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, field)| *field)
}

/// Decide between header and positional mode for a tokenized grid
pub fn resolve_headers(matrix: &Matrix) -> HeaderResolution {
    let Some(first) = matrix.rows.first() else {
        return HeaderResolution {
            mode: HeaderMode::Positional,
            mapping: ColumnMapping::positional(),
            data_start: 0,
        };
    };

    let columns: Vec<Option<Field>> = first.cells.iter().map(|c| lookup_field(c)).collect();

    if columns.iter().any(Option::is_some) {
        let mapping = ColumnMapping::from_columns(columns);
        debug!("Header row detected, mapped fields: {:?}", mapping.fields());
        HeaderResolution {
            mode: HeaderMode::Header,
            mapping,
            data_start: 1,
        }
    } else {
        debug!(
            "No header row recognised in {} columns, using positional layout",
            first.cells.len()
        );
        HeaderResolution {
            mode: HeaderMode::Positional,
            mapping: ColumnMapping::positional(),
            data_start: 0,
        }
    }
}

/// Apply a caller-supplied header list; every matrix row is data
pub fn resolve_with_headers<S: AsRef<str>>(matrix: &Matrix, headers: &[S]) -> HeaderResolution {
    let columns = headers.iter().map(|h| lookup_field(h.as_ref())).collect();
    let mapping = ColumnMapping::from_columns(columns);
    debug!("Predefined headers mapped fields: {:?}", mapping.fields());

    if matrix.width() > headers.len() {
        debug!(
            "Rows are {} cells wide but only {} headers were supplied, extra cells ignored",
            matrix.width(),
            headers.len()
        );
    }

    HeaderResolution {
        mode: HeaderMode::Predefined,
        mapping,
        data_start: 0,
    }
}
