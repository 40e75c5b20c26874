//! Stream creation, ALL expansion and variation saves

use super::super::{ReconcileOptions, SaveMode};
use super::{elective, record, run, stream_unit_codes};
use crate::models::{NewQualification, NewStream, Owner, UnitType};
use crate::store::{InMemoryStore, RecordStore};

#[tokio::test]
async fn test_all_expands_to_streams_created_in_same_run() {
    let store = InMemoryStore::new();
    let mut required = elective("Q1", "U3", &["all"]);
    required.is_required = true;
    let records = vec![
        elective("Q1", "U1", &["Finance"]),
        elective("Q1", "U2", &["Admin"]),
        required,
        record("Q1", "U4", UnitType::Core),
    ];

    let summary = run(&store, &records, &ReconcileOptions::default()).await;

    assert_eq!(summary.created.streams, 2);
    assert_eq!(summary.created.stream_links, 4);
    assert_eq!(stream_unit_codes(&store, "Finance"), vec!["U1", "U3"]);
    assert_eq!(stream_unit_codes(&store, "Admin"), vec!["U2", "U3"]);
    assert!(
        store
            .stream_units()
            .iter()
            .filter(|l| l.is_required)
            .count()
            == 2
    );
}

#[tokio::test]
async fn test_all_uses_existing_streams() {
    let store = InMemoryStore::new();
    let qualification = store
        .upsert_qualifications(&[NewQualification {
            code: "Q1".to_string(),
            name: "Q1 name".to_string(),
            training_package: None,
        }])
        .await
        .unwrap()
        .remove(0);
    store
        .insert_streams(&[NewStream {
            owner: Owner::Qualification(qualification.id),
            name: "Existing".to_string(),
        }])
        .await
        .unwrap();

    let summary = run(
        &store,
        &[elective("Q1", "U1", &["ALL"])],
        &ReconcileOptions::default(),
    )
    .await;

    assert_eq!(summary.created.streams, 0);
    assert_eq!(stream_unit_codes(&store, "Existing"), vec!["U1"]);
}

#[tokio::test]
async fn test_all_without_streams_is_counted() {
    let store = InMemoryStore::new();
    let summary = run(
        &store,
        &[elective("Q1", "U1", &["ALL"])],
        &ReconcileOptions::default(),
    )
    .await;

    assert_eq!(summary.skipped.unresolved_stream_targets, 1);
    assert!(store.stream_units().is_empty());
}

#[tokio::test]
async fn test_stream_names_match_case_insensitively() {
    let store = InMemoryStore::new();
    let records = vec![
        elective("Q1", "U1", &["Finance"]),
        elective("Q1", "U2", &["FINANCE"]),
    ];

    let summary = run(&store, &records, &ReconcileOptions::default()).await;

    assert_eq!(summary.created.streams, 1);
    assert_eq!(store.streams()[0].name, "Finance");
    assert_eq!(stream_unit_codes(&store, "Finance"), vec!["U1", "U2"]);
}

#[tokio::test]
async fn test_core_rows_create_streams_but_not_links() {
    let store = InMemoryStore::new();
    let mut core = record("Q1", "U1", UnitType::Core);
    core.streams = crate::models::StreamTargets::Named(vec!["Finance".to_string()]);

    let summary = run(&store, &[core], &ReconcileOptions::default()).await;

    assert_eq!(summary.created.streams, 1);
    assert!(store.stream_units().is_empty());
}

#[tokio::test]
async fn test_stream_index_read_once_per_run() {
    let store = InMemoryStore::new();
    let records: Vec<_> = (0..20)
        .map(|i| elective("Q1", &format!("U{i}"), &["Finance", "Admin"]))
        .chain((0..5).map(|i| elective("Q1", &format!("V{i}"), &["ALL"])))
        .collect();

    run(&store, &records, &ReconcileOptions::default()).await;

    assert_eq!(store.call_count("select_streams"), 1);
    assert_eq!(store.call_count("insert_streams"), 1);
    assert_eq!(stream_unit_codes(&store, "Finance").len(), 25);
}

#[tokio::test]
async fn test_variation_save_replaces_links() {
    let store = InMemoryStore::new();
    let variation = ReconcileOptions::default().with_mode(SaveMode::Variation("Retail".into()));

    run(
        &store,
        &[
            record("Q1", "U1", UnitType::Core),
            elective("Q1", "U2", &[]),
        ],
        &variation,
    )
    .await;
    assert_eq!(stream_unit_codes(&store, "Retail"), vec!["U1", "U2"]);

    let summary = run(
        &store,
        &[
            record("Q1", "U1", UnitType::Core),
            elective("Q1", "U3", &[]),
        ],
        &variation,
    )
    .await;

    assert_eq!(summary.removed.stream_links, 2);
    assert_eq!(summary.created.stream_links, 2);
    assert_eq!(stream_unit_codes(&store, "Retail"), vec!["U1", "U3"]);
    assert_eq!(store.streams().len(), 1);
}

#[tokio::test]
async fn test_variation_save_is_idempotent() {
    let store = InMemoryStore::new();
    let variation = ReconcileOptions::default().with_mode(SaveMode::Variation("Retail".into()));
    let records = vec![elective("Q1", "U1", &["Other"])];

    run(&store, &records, &variation).await;
    let first = store.stream_units();
    run(&store, &records, &variation).await;

    assert_eq!(store.stream_units().len(), first.len());
    assert_eq!(stream_unit_codes(&store, "Retail"), vec!["U1"]);
    assert!(store.streams().iter().all(|s| s.name == "Retail"));
}
