//! Field cleanup and coercion helpers
//!
//! Spreadsheet exports and browser pastes carry invisible characters that
//! break code lookups; every cell goes through [`clean`] before anything
//! else reads it.

use crate::constants::{
    ALL_STREAMS, CORE_SPELLINGS, ELECTIVE_SPELLINGS, STREAM_SEPARATORS, TRUTHY_VALUES,
};
use crate::models::{StreamTargets, UnitType};

/// Characters removed outright from every cell
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{feff}'
            | '\u{200b}'..='\u{200d}'
            | '\u{2060}'
            | '\u{200e}'
            | '\u{200f}'
            | '\u{202a}'..='\u{202e}'
    )
}

/// Strip invisible marks, turn non-breaking spaces into spaces and trim
pub fn clean(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();
    cleaned.trim().to_string()
}

/// Clean and upper-case a qualification, unit or RTO code
pub fn normalize_code(value: &str) -> String {
    clean(value).to_uppercase()
}

/// Cleaned value, or `None` when nothing is left
pub fn optional_text(value: &str) -> Option<String> {
    let cleaned = clean(value);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Boolean-like cell: `1`, `true`, `yes`, `y` in any case
pub fn parse_bool(value: &str) -> bool {
    let cleaned = clean(value);
    TRUTHY_VALUES
        .iter()
        .any(|truthy| cleaned.eq_ignore_ascii_case(truthy))
}

/// Lenient unit type: anything mentioning "elective" is elective, the rest core
pub fn classify_unit_type(value: &str) -> UnitType {
    if clean(value).to_lowercase().contains("elective") {
        UnitType::Elective
    } else {
        UnitType::Core
    }
}

/// Strict unit type used by validation, `None` when unrecognized
///
/// Accepts the exact spellings, or `core`/`elective` as a whole word.
pub fn recognize_unit_type(value: &str) -> Option<UnitType> {
    let lowered = clean(value).to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    // "Scorecard" must not read as core
    let has_word = |word: &str| {
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word)
    };

    if ELECTIVE_SPELLINGS.contains(&lowered.as_str()) || has_word("elective") {
        Some(UnitType::Elective)
    } else if CORE_SPELLINGS.contains(&lowered.as_str()) || has_word("core") {
        Some(UnitType::Core)
    } else {
        None
    }
}

/// Split a stream cell into targets
///
/// `ALL` anywhere in the list wins over named streams. Names repeated with
/// different case collapse onto their first spelling.
pub fn split_streams(value: &str) -> StreamTargets {
    let cleaned = clean(value);
    let mut names: Vec<String> = Vec::new();

    for part in cleaned.split(STREAM_SEPARATORS) {
        let name = clean(part);
        if name.is_empty() {
            continue;
        }
        if name.eq_ignore_ascii_case(ALL_STREAMS) {
            return StreamTargets::All;
        }
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }

    if names.is_empty() {
        StreamTargets::None
    } else {
        StreamTargets::Named(names)
    }
}

/// Leading alphabetic prefix of a qualification code, e.g. `BSB30120` -> `BSB`
pub fn training_package(code: &str) -> Option<String> {
    let prefix: String = code
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_uppercase())
    }
}
