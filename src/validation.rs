//! Row validation and import summary counts
//!
//! Validation never touches the store. It reports what is wrong with each
//! normalized row and how many distinct qualifications and units the import
//! would touch, leaving the caller to decide what to do with invalid rows.

use crate::constants::REQUIRED_FIELDS;
use crate::models::{ImportRecord, UnitType};
use crate::parser::field_parsers::recognize_unit_type;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// One problem found in one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Position of the record in the validated slice
    pub index: usize,
    /// Source line shown to the operator
    pub line: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.line, self.message)
    }
}

/// Aggregate counts over all retained rows, valid or not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationCounts {
    pub rows: usize,
    pub qualifications: usize,
    pub units: usize,
    pub cores: usize,
    pub electives: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<RowError>,
    pub counts: ValidationCounts,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error lines formatted for display, in row order
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Number of distinct rows with at least one error
    pub fn invalid_rows(&self) -> usize {
        self.invalid_indices().len()
    }

    fn invalid_indices(&self) -> HashSet<usize> {
        self.errors.iter().map(|e| e.index).collect()
    }

    /// Records without any reported error
    pub fn valid_records(&self, records: &[ImportRecord]) -> Vec<ImportRecord> {
        let invalid = self.invalid_indices();
        records
            .iter()
            .enumerate()
            .filter(|(index, _)| !invalid.contains(index))
            .map(|(_, record)| record.clone())
            .collect()
    }
}

/// Validate normalized records
///
/// Each empty required field yields `Missing "<field>"`. An empty or
/// unrecognised unit type yields a single `unit_type must be Core or
/// Elective` error rather than a missing-field error.
pub fn validate(records: &[ImportRecord]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut qualifications = BTreeSet::new();
    let mut units = BTreeSet::new();
    let mut cores = 0;
    let mut electives = 0;

    for (index, record) in records.iter().enumerate() {
        for field in REQUIRED_FIELDS {
            if record.text(*field).is_empty() {
                errors.push(RowError {
                    index,
                    line: record.line,
                    message: format!("Missing \"{}\"", field),
                });
            }
        }

        match recognize_unit_type(&record.unit_type_raw) {
            Some(UnitType::Core) => cores += 1,
            Some(UnitType::Elective) => electives += 1,
            None => errors.push(RowError {
                index,
                line: record.line,
                message: "unit_type must be Core or Elective".to_string(),
            }),
        }

        if !record.qualification_code.is_empty() {
            qualifications.insert(record.qualification_code.as_str());
        }
        if !record.unit_code.is_empty() {
            units.insert(record.unit_code.as_str());
        }
    }

    ValidationReport {
        errors,
        counts: ValidationCounts {
            rows: records.len(),
            qualifications: qualifications.len(),
            units: units.len(),
            cores,
            electives,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{normalize_rows, resolve_headers, tokenize};

    fn records(text: &str) -> Vec<ImportRecord> {
        let matrix = tokenize(text).unwrap();
        normalize_rows(&matrix, &resolve_headers(&matrix))
    }

    const HEADER: &str =
        "qualification_code,qualification_name,unit_code,unit_name,unit_description,unit_type\n";

    #[test]
    fn test_minimal_import_is_valid() {
        let text = format!("{HEADER}BSB30120,Cert III,BSBCRT311,Think,Critical thinking,Core\n");
        let report = validate(&records(&text));

        assert!(report.is_valid());
        assert_eq!(
            report.counts,
            ValidationCounts {
                rows: 1,
                qualifications: 1,
                units: 1,
                cores: 1,
                electives: 0
            }
        );
    }

    #[test]
    fn test_missing_unit_type_single_error() {
        let text = format!("{HEADER}BSB30120,Cert III,BSBCRT311,Think,Critical thinking,\n");
        let records = records(&text);
        let report = validate(&records);

        assert_eq!(records.len(), 1);
        assert_eq!(
            report.messages(),
            vec!["Row 2: unit_type must be Core or Elective".to_string()]
        );
        assert!(report.valid_records(&records).is_empty());
    }

    #[test]
    fn test_missing_fields_reported_per_field() {
        let text = format!("{HEADER},Cert III,BSBCRT311,,Desc,e\n");
        let report = validate(&records(&text));

        assert_eq!(
            report.messages(),
            vec![
                "Row 2: Missing \"qualification_code\"".to_string(),
                "Row 2: Missing \"unit_name\"".to_string(),
            ]
        );
        assert_eq!(report.invalid_rows(), 1);
        assert_eq!(report.counts.electives, 1);
        assert_eq!(report.counts.qualifications, 0);
    }

    #[test]
    fn test_distinct_counts_and_valid_subset() {
        let text = format!(
            "{HEADER}\
BSB30120,Cert III,U1,Unit one,D,Core\n\
BSB30120,Cert III,U2,Unit two,D,Elective\n\
BSB40120,Cert IV,U1,Unit one,D,optional\n"
        );
        let records = records(&text);
        let report = validate(&records);

        assert_eq!(report.counts.rows, 3);
        assert_eq!(report.counts.qualifications, 2);
        assert_eq!(report.counts.units, 2);
        assert_eq!(report.counts.cores, 1);
        assert_eq!(report.counts.electives, 1);
        assert_eq!(report.messages(), vec!["Row 4: unit_type must be Core or Elective"]);

        let valid = report.valid_records(&records);
        assert_eq!(valid.len(), 2);
        assert!(valid.iter().all(|r| r.qualification_code == "BSB30120"));
    }
}
