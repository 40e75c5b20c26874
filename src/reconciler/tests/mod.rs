//! Test utilities for reconciliation
//!
//! Builders for normalized records and a shortcut for running a reconcile
//! against an [`InMemoryStore`].

use super::{ReconcileOptions, ReconcileSummary, reconcile};
use crate::models::{ImportRecord, StreamTargets, UnitType};
use crate::store::InMemoryStore;

mod idempotence_tests;
mod stream_tests;

/// A valid record for one qualification and unit
pub fn record(qualification: &str, unit: &str, unit_type: UnitType) -> ImportRecord {
    ImportRecord {
        line: 2,
        qualification_code: qualification.to_string(),
        qualification_name: format!("{qualification} name"),
        unit_code: unit.to_string(),
        unit_name: format!("{unit} name"),
        unit_description: format!("{unit} description"),
        unit_type,
        unit_type_raw: unit_type.as_str().to_string(),
        ..ImportRecord::default()
    }
}

pub fn elective(qualification: &str, unit: &str, streams: &[&str]) -> ImportRecord {
    let mut record = record(qualification, unit, UnitType::Elective);
    record.streams = if streams.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        StreamTargets::All
    } else if streams.is_empty() {
        StreamTargets::None
    } else {
        StreamTargets::Named(streams.iter().map(|s| s.to_string()).collect())
    };
    record
}

pub fn with_rto(mut record: ImportRecord, rto: &str) -> ImportRecord {
    record.rto_code = Some(rto.to_string());
    record
}

pub async fn run(
    store: &InMemoryStore,
    records: &[ImportRecord],
    options: &ReconcileOptions,
) -> ReconcileSummary {
    reconcile(records, store, options).await.unwrap()
}

/// Unit codes linked to any owner, sorted
pub fn linked_unit_codes(store: &InMemoryStore) -> Vec<String> {
    let units = store.units();
    let mut codes: Vec<String> = store
        .unit_links()
        .iter()
        .filter_map(|link| units.iter().find(|u| u.id == link.unit_id))
        .map(|u| u.code.clone())
        .collect();
    codes.sort();
    codes
}

/// Unit codes linked to the named stream, sorted
pub fn stream_unit_codes(store: &InMemoryStore, stream: &str) -> Vec<String> {
    let units = store.units();
    let Some(stream) = store.streams().into_iter().find(|s| s.name == stream) else {
        return Vec::new();
    };
    let mut codes: Vec<String> = store
        .stream_units()
        .iter()
        .filter(|l| l.stream_id == stream.id)
        .filter_map(|l| units.iter().find(|u| u.id == l.unit_id))
        .map(|u| u.code.clone())
        .collect();
    codes.sort();
    codes
}
