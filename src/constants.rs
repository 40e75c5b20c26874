//! Application constants for the RTO importer
//!
//! This module contains the recognised column vocabulary, default values
//! and fixed mappings used throughout the import pipeline.

use crate::models::Field;

// =============================================================================
// Column Vocabulary
// =============================================================================

/// Normalised header keys and the canonical field each one maps to.
///
/// Keys are matched after `parser::header::header_key` has cleaned, lower-cased and
/// snake_cased the raw header cell.
pub const HEADER_SYNONYMS: &[(&str, Field)] = &[
    // Qualification
    ("qualification_code", Field::QualificationCode),
    ("qualification", Field::QualificationCode),
    ("qual_code", Field::QualificationCode),
    ("qualification_name", Field::QualificationName),
    ("qualification_title", Field::QualificationName),
    ("extra_info_for_names", Field::QualificationName),
    // Unit
    ("unit_code", Field::UnitCode),
    ("code", Field::UnitCode),
    ("unit_name", Field::UnitName),
    ("unit_title", Field::UnitName),
    ("unit_description", Field::UnitDescription),
    ("description", Field::UnitDescription),
    ("unit_type", Field::UnitType),
    ("type", Field::UnitType),
    ("core_elective", Field::UnitType),
    // Grouping
    ("group_label", Field::GroupLabel),
    ("group", Field::GroupLabel),
    ("group_code", Field::GroupLabel),
    ("cluster", Field::GroupLabel),
    ("cluster_info", Field::GroupLabel),
    // Streams / variations
    ("stream_name", Field::StreamName),
    ("stream_names", Field::StreamName),
    ("stream", Field::StreamName),
    ("streams", Field::StreamName),
    ("variation", Field::StreamName),
    ("variations", Field::StreamName),
    ("qualification_variation", Field::StreamName),
    // Flags and extras
    ("is_required", Field::IsRequired),
    ("required", Field::IsRequired),
    ("isrequired", Field::IsRequired),
    ("rto_code", Field::RtoCode),
    ("rto", Field::RtoCode),
    ("application_details", Field::ApplicationDetails),
    ("put_application_details_here", Field::ApplicationDetails),
];

/// Column order assumed when the first row carries no recognisable header
pub const POSITIONAL_FIELDS: &[Field] = &[
    Field::UnitCode,
    Field::UnitName,
    Field::UnitDescription,
    Field::UnitType,
    Field::GroupLabel,
];

/// Fields that must be non-empty for a row to pass validation.
///
/// `unit_type` is checked separately because it must also classify.
pub const REQUIRED_FIELDS: &[Field] = &[
    Field::QualificationCode,
    Field::QualificationName,
    Field::UnitCode,
    Field::UnitName,
    Field::UnitDescription,
];

// =============================================================================
// Normalisation
// =============================================================================

/// Wildcard stream target meaning every stream of the owner
pub const ALL_STREAMS: &str = "ALL";

/// Separators accepted between stream names in one cell
pub const STREAM_SEPARATORS: &[char] = &[';', '|', ','];

/// Values read as `true` for boolean-like columns (case-insensitive)
pub const TRUTHY_VALUES: &[&str] = &["1", "true", "yes", "y"];

/// Unit type spellings accepted by validation
pub const CORE_SPELLINGS: &[&str] = &["core", "c"];
pub const ELECTIVE_SPELLINGS: &[&str] = &["elective", "e"];

// =============================================================================
// Reconciliation Defaults
// =============================================================================

/// Rows per write call, keeps payloads under typical API limits
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Trading name given to RTOs created implicitly during import
pub const RTO_TRADING_NAME_PREFIX: &str = "RTO ";

/// Status for offers created by the importer
pub const NEW_OFFER_STATUS: &str = "draft";

// =============================================================================
// Storage Locations
// =============================================================================

/// Application directory name under the platform data dir
pub const APP_DIR_NAME: &str = "rto-importer";

/// Default SQLite database file name
pub const DEFAULT_DATABASE_FILE: &str = "rto_importer.sqlite3";

/// Draft key used by the CLI for the last pasted grid
pub const LAST_PASTE_DRAFT: &str = "last-paste";
