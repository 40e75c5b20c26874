//! Tests for header detection and column mapping

use super::super::header::{
    HeaderMode, header_key, lookup_field, resolve_headers, resolve_with_headers,
};
use super::super::tokenizer::tokenize;
use crate::models::Field;

#[test]
fn test_header_key_normalization() {
    assert_eq!(header_key("Unit Code"), "unit_code");
    assert_eq!(header_key("  Unit   Code  "), "unit_code");
    assert_eq!(header_key("\u{feff}Unit-Code\u{200b}"), "unit_code");
    assert_eq!(header_key("Catégorie"), "categorie");
    assert_eq!(header_key("(Required?)"), "required");
    assert_eq!(header_key("Put application details here"), "put_application_details_here");
}

#[test]
fn test_synonyms() {
    assert_eq!(lookup_field("Code"), Some(Field::UnitCode));
    assert_eq!(lookup_field("Extra Info for names"), Some(Field::QualificationName));
    assert_eq!(lookup_field("Variation"), Some(Field::StreamName));
    assert_eq!(lookup_field("Streams"), Some(Field::StreamName));
    assert_eq!(lookup_field("qualification_variation"), Some(Field::StreamName));
    assert_eq!(lookup_field("IsRequired"), Some(Field::IsRequired));
    assert_eq!(lookup_field("cluster_info"), Some(Field::GroupLabel));
    assert_eq!(
        lookup_field("Put application details here"),
        Some(Field::ApplicationDetails)
    );
    assert_eq!(lookup_field("Notes"), None);
}

#[test]
fn test_header_mode_detected() {
    let matrix = tokenize("Notes,Unit Code,Unit Name\nx,BSB1,Name\n").unwrap();
    let resolution = resolve_headers(&matrix);

    assert_eq!(resolution.mode, HeaderMode::Header);
    assert_eq!(resolution.data_start, 1);
    assert_eq!(resolution.mapping.field_at(0), None);
    assert_eq!(resolution.mapping.index_of(Field::UnitCode), Some(1));
    assert_eq!(resolution.mapping.index_of(Field::UnitName), Some(2));
    assert!(!resolution.mapping.contains(Field::UnitType));
}

#[test]
fn test_positional_fallback() {
    let matrix = tokenize("BSB1,Name,Desc,Core,Group A\n").unwrap();
    let resolution = resolve_headers(&matrix);

    assert_eq!(resolution.mode, HeaderMode::Positional);
    assert_eq!(resolution.data_start, 0);
    assert_eq!(
        resolution.mapping.fields(),
        vec![
            Field::UnitCode,
            Field::UnitName,
            Field::UnitDescription,
            Field::UnitType,
            Field::GroupLabel
        ]
    );
}

#[test]
fn test_resolution_is_deterministic() {
    let text = "Type,Code,Code,Title\nCore,A,B,T\n";
    let first = resolve_headers(&tokenize(text).unwrap());
    let second = resolve_headers(&tokenize(text).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_first_duplicate_column_wins() {
    let matrix = tokenize("Code,Unit Code,Unit Name\nA,B,C\n").unwrap();
    let resolution = resolve_headers(&matrix);

    assert_eq!(resolution.mapping.index_of(Field::UnitCode), Some(0));
    assert_eq!(resolution.mapping.field_at(1), None);
}

#[test]
fn test_predefined_headers() {
    let matrix = tokenize("BSB1,Name\nBSB2,Other\n").unwrap();
    let resolution = resolve_with_headers(&matrix, &["unit code", "unit name"]);

    assert_eq!(resolution.mode, HeaderMode::Predefined);
    assert_eq!(resolution.data_start, 0);
    assert_eq!(resolution.mapping.index_of(Field::UnitName), Some(1));
}

#[test]
fn test_empty_matrix_is_positional() {
    let matrix = tokenize("").unwrap();
    assert_eq!(resolve_headers(&matrix).mode, HeaderMode::Positional);
}
