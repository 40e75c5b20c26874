//! Row normalization into import records

use super::field_parsers::{
    classify_unit_type, clean, normalize_code, optional_text, parse_bool, split_streams,
};
use super::header::{ColumnMapping, HeaderResolution};
use super::tokenizer::{Matrix, MatrixRow};
use crate::models::{Field, ImportRecord, RecordDefaults};
use tracing::debug;

fn raw<'a>(row: &'a MatrixRow, mapping: &ColumnMapping, field: Field) -> &'a str {
    mapping
        .index_of(field)
        .map(|index| row.cell(index))
        .unwrap_or("")
}

/// Normalize one data row
///
/// Returns `None` only when unit code, name and description are all empty.
/// Rows missing other values are kept so validation can report them.
pub fn normalize(row: &MatrixRow, mapping: &ColumnMapping) -> Option<ImportRecord> {
    let unit_code = normalize_code(raw(row, mapping, Field::UnitCode));
    let unit_name = clean(raw(row, mapping, Field::UnitName));
    let unit_description = clean(raw(row, mapping, Field::UnitDescription));

    if unit_code.is_empty() && unit_name.is_empty() && unit_description.is_empty() {
        return None;
    }

    let unit_type_text = raw(row, mapping, Field::UnitType);

    Some(ImportRecord {
        line: row.line,
        qualification_code: normalize_code(raw(row, mapping, Field::QualificationCode)),
        qualification_name: clean(raw(row, mapping, Field::QualificationName)),
        unit_code,
        unit_name,
        unit_description,
        unit_type: classify_unit_type(unit_type_text),
        unit_type_raw: clean(unit_type_text).to_lowercase(),
        group_label: optional_text(raw(row, mapping, Field::GroupLabel)),
        streams: split_streams(raw(row, mapping, Field::StreamName)),
        is_required: parse_bool(raw(row, mapping, Field::IsRequired)),
        rto_code: optional_text(&normalize_code(raw(row, mapping, Field::RtoCode))),
        application_details: optional_text(raw(row, mapping, Field::ApplicationDetails)),
    })
}

/// Normalize every data row of a resolved matrix
pub fn normalize_rows(matrix: &Matrix, resolution: &HeaderResolution) -> Vec<ImportRecord> {
    let data_rows = matrix.rows.iter().skip(resolution.data_start);
    let total = data_rows.len();

    let records: Vec<ImportRecord> = data_rows
        .filter_map(|row| normalize(row, &resolution.mapping))
        .collect();

    if records.len() < total {
        debug!(
            "Dropped {} rows with no unit code, name or description",
            total - records.len()
        );
    }
    records
}

/// Fill qualification and RTO values the rows left empty
pub fn apply_defaults(records: &mut [ImportRecord], defaults: &RecordDefaults) {
    if defaults.is_empty() {
        return;
    }

    let qualification_code = defaults
        .qualification_code
        .as_deref()
        .map(normalize_code)
        .filter(|c| !c.is_empty());
    let qualification_name = defaults
        .qualification_name
        .as_deref()
        .and_then(optional_text);
    let rto_code = defaults
        .rto_code
        .as_deref()
        .map(normalize_code)
        .filter(|c| !c.is_empty());

    for record in records.iter_mut() {
        if record.qualification_code.is_empty() {
            if let Some(code) = &qualification_code {
                record.qualification_code = code.clone();
            }
        }
        if record.qualification_name.is_empty() {
            if let Some(name) = &qualification_name {
                record.qualification_name = name.clone();
            }
        }
        if record.rto_code.is_none() {
            record.rto_code = rto_code.clone();
        }
    }
}
