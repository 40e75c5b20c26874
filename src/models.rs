//! Core data structures and types for RTO imports.
//!
//! Defines the canonical field vocabulary, normalized import records, and
//! the store entities (qualifications, units, offers, streams and their
//! links) the reconciler reads and writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the record store
pub type RecordId = String;

/// Canonical fields recognised in import columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    QualificationCode,
    QualificationName,
    UnitCode,
    UnitName,
    UnitDescription,
    UnitType,
    GroupLabel,
    StreamName,
    RtoCode,
    IsRequired,
    ApplicationDetails,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::QualificationCode => "qualification_code",
            Field::QualificationName => "qualification_name",
            Field::UnitCode => "unit_code",
            Field::UnitName => "unit_name",
            Field::UnitDescription => "unit_description",
            Field::UnitType => "unit_type",
            Field::GroupLabel => "group_label",
            Field::StreamName => "stream_name",
            Field::RtoCode => "rto_code",
            Field::IsRequired => "is_required",
            Field::ApplicationDetails => "application_details",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit category within a qualification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    #[default]
    Core,
    Elective,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Core => "core",
            UnitType::Elective => "elective",
        }
    }

    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("elective") {
            UnitType::Elective
        } else {
            UnitType::Core
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream targets named by a record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "names", rename_all = "snake_case")]
pub enum StreamTargets {
    #[default]
    None,
    /// Every stream the owner has when links are built
    All,
    Named(Vec<String>),
}

impl StreamTargets {
    pub fn is_none(&self) -> bool {
        matches!(self, StreamTargets::None)
    }

    /// Explicit names, empty for `None` and `All`
    pub fn names(&self) -> &[String] {
        match self {
            StreamTargets::Named(names) => names,
            _ => &[],
        }
    }
}

/// A normalized import row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportRecord {
    /// 1-based source line the row started on
    pub line: usize,
    pub qualification_code: String,
    pub qualification_name: String,
    pub unit_code: String,
    pub unit_name: String,
    pub unit_description: String,
    pub unit_type: UnitType,
    /// Cleaned, lower-cased unit type text as supplied
    pub unit_type_raw: String,
    pub group_label: Option<String>,
    pub streams: StreamTargets,
    pub is_required: bool,
    pub rto_code: Option<String>,
    pub application_details: Option<String>,
}

impl ImportRecord {
    /// Text value of a plain field, used by validation
    pub fn text(&self, field: Field) -> &str {
        match field {
            Field::QualificationCode => &self.qualification_code,
            Field::QualificationName => &self.qualification_name,
            Field::UnitCode => &self.unit_code,
            Field::UnitName => &self.unit_name,
            Field::UnitDescription => &self.unit_description,
            Field::UnitType => &self.unit_type_raw,
            Field::GroupLabel => self.group_label.as_deref().unwrap_or(""),
            Field::RtoCode => self.rto_code.as_deref().unwrap_or(""),
            Field::ApplicationDetails => self.application_details.as_deref().unwrap_or(""),
            Field::StreamName | Field::IsRequired => "",
        }
    }
}

/// Operator-supplied values for records that lack them
///
/// Pasted unit grids usually carry no qualification or RTO columns; the
/// operator enters those once for the whole grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDefaults {
    pub qualification_code: Option<String>,
    pub qualification_name: Option<String>,
    pub rto_code: Option<String>,
}

impl RecordDefaults {
    pub fn is_empty(&self) -> bool {
        self.qualification_code.is_none()
            && self.qualification_name.is_none()
            && self.rto_code.is_none()
    }
}

// =============================================================================
// Store entities
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rto {
    pub id: RecordId,
    pub rto_code: String,
    pub trading_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRto {
    pub rto_code: String,
    pub trading_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub id: RecordId,
    pub code: String,
    pub name: String,
    pub training_package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQualification {
    pub code: String,
    pub name: String,
    pub training_package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: RecordId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: RecordId,
    pub rto_id: RecordId,
    pub qualification_id: RecordId,
    pub company_id: Option<String>,
    pub status: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOffer {
    pub rto_id: RecordId,
    pub qualification_id: RecordId,
    pub company_id: Option<String>,
    pub status: String,
    pub is_public: bool,
}

/// Entity that unit links and streams attach to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    Qualification(RecordId),
    Offer(RecordId),
}

impl Owner {
    pub fn id(&self) -> &str {
        match self {
            Owner::Qualification(id) | Owner::Offer(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Owner::Qualification(_) => "qualification",
            Owner::Offer(_) => "offer",
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Qualification–unit or offer–unit link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLink {
    pub owner: Owner,
    pub unit_id: RecordId,
    pub unit_type: UnitType,
    pub group_code: Option<String>,
    pub application_details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: RecordId,
    pub owner: Owner,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStream {
    pub owner: Owner,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUnitLink {
    pub stream_id: RecordId,
    pub unit_id: RecordId,
    pub group_code: Option<String>,
    pub is_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_snake_case() {
        assert_eq!(Field::QualificationCode.as_str(), "qualification_code");
        assert_eq!(Field::ApplicationDetails.to_string(), "application_details");
    }

    #[test]
    fn test_unit_type_from_db() {
        assert_eq!(UnitType::from_db("ELECTIVE"), UnitType::Elective);
        assert_eq!(UnitType::from_db("core"), UnitType::Core);
        assert_eq!(UnitType::from_db("anything"), UnitType::Core);
    }

    #[test]
    fn test_owner_display() {
        let owner = Owner::Offer("abc".to_string());
        assert_eq!(owner.to_string(), "offer:abc");
        assert_eq!(owner.id(), "abc");
    }
}
