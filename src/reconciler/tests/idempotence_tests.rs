//! Re-running an import converges without duplicates

use super::super::ReconcileOptions;
use super::{elective, linked_unit_codes, record, run};
use crate::config::NameUpdatePolicy;
use crate::models::UnitType;
use crate::store::InMemoryStore;

#[tokio::test]
async fn test_minimal_import() {
    let store = InMemoryStore::new();
    let summary = run(
        &store,
        &[record("BSB30120", "BSBCRT311", UnitType::Core)],
        &ReconcileOptions::default(),
    )
    .await;

    assert_eq!(summary.created.qualifications, 1);
    assert_eq!(summary.created.units, 1);
    assert_eq!(summary.created.unit_links, 1);
    assert_eq!(store.qualifications()[0].training_package.as_deref(), Some("BSB"));
    assert_eq!(store.unit_links()[0].unit_type, UnitType::Core);
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let store = InMemoryStore::new();
    let records = vec![
        record("BSB30120", "U1", UnitType::Core),
        elective("BSB30120", "U2", &["Finance", "Admin"]),
        elective("BSB30120", "U3", &["ALL"]),
        record("BSB40120", "U1", UnitType::Core),
    ];
    let options = ReconcileOptions::default();

    let first = run(&store, &records, &options).await;
    let snapshot = (
        store.qualifications(),
        store.units(),
        store.unit_links(),
        store.streams(),
        store.stream_units(),
    );

    let second = run(&store, &records, &options).await;

    assert!(first.changed_structure());
    assert!(!second.changed_structure());
    assert_eq!(second.updated.qualifications, 0);
    assert_eq!(second.updated.units, 0);
    assert_eq!(second.updated.unit_links, 4);
    assert_eq!(
        snapshot,
        (
            store.qualifications(),
            store.units(),
            store.unit_links(),
            store.streams(),
            store.stream_units(),
        )
    );
}

#[tokio::test]
async fn test_last_record_wins_for_duplicate_links() {
    let store = InMemoryStore::new();
    let mut later = elective("Q1", "U1", &[]);
    later.group_label = Some("Group B".to_string());

    let summary = run(
        &store,
        &[record("Q1", "U1", UnitType::Core), later],
        &ReconcileOptions::default(),
    )
    .await;

    assert_eq!(summary.created.unit_links, 1);
    let links = store.unit_links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].unit_type, UnitType::Elective);
    assert_eq!(links[0].group_code.as_deref(), Some("Group B"));
}

#[tokio::test]
async fn test_codes_match_existing_rows() {
    let store = InMemoryStore::new();
    run(
        &store,
        &[record("BSB30120", "BSBCRT311", UnitType::Core)],
        &ReconcileOptions::default(),
    )
    .await;

    let matrix = crate::parser::tokenize(
        "qualification_code,unit_code,unit_name,unit_description,unit_type\n \
         bsb30120 , bsbcrt311 ,Name,Desc,core\n",
    )
    .unwrap();
    let records =
        crate::parser::normalize_rows(&matrix, &crate::parser::resolve_headers(&matrix));
    let summary = run(&store, &records, &ReconcileOptions::default()).await;

    assert_eq!(summary.created.qualifications, 0);
    assert_eq!(summary.created.units, 0);
    assert_eq!(store.qualifications().len(), 1);
    assert_eq!(linked_unit_codes(&store), vec!["BSBCRT311"]);
}

#[tokio::test]
async fn test_name_policies() {
    let store = InMemoryStore::new();
    run(
        &store,
        &[record("Q1", "U1", UnitType::Core)],
        &ReconcileOptions::default(),
    )
    .await;

    let mut renamed = record("Q1", "U1", UnitType::Core);
    renamed.qualification_name = "Renamed".to_string();
    renamed.unit_name = "Renamed unit".to_string();

    let never = ReconcileOptions::default().with_name_policy(NameUpdatePolicy::Never);
    let summary = run(&store, &[renamed.clone()], &never).await;
    assert_eq!(summary.updated.qualifications, 0);
    assert_eq!(store.qualifications()[0].name, "Q1 name");

    let summary = run(&store, &[renamed], &ReconcileOptions::default()).await;
    assert_eq!(summary.updated.qualifications, 1);
    assert_eq!(summary.updated.units, 1);
    assert_eq!(store.qualifications()[0].name, "Renamed");
    assert_eq!(store.units()[0].name, "Renamed unit");
    assert_eq!(store.units()[0].description.as_deref(), Some("U1 description"));
}

#[tokio::test]
async fn test_missing_names_fall_back_to_code() {
    let store = InMemoryStore::new();
    let mut bare = record("Q1", "U1", UnitType::Core);
    bare.qualification_name.clear();
    bare.unit_name.clear();

    run(&store, &[bare], &ReconcileOptions::default()).await;

    assert_eq!(store.qualifications()[0].name, "Q1");
    assert_eq!(store.units()[0].name, "U1");
}

#[tokio::test]
async fn test_batches_respect_size() {
    let store = InMemoryStore::new();
    let records: Vec<_> = (0..5)
        .map(|i| record("Q1", &format!("U{i}"), UnitType::Core))
        .collect();

    run(
        &store,
        &records,
        &ReconcileOptions::default().with_batch_size(2),
    )
    .await;

    assert_eq!(store.call_count("upsert_units"), 3);
    assert_eq!(store.call_count("upsert_unit_links"), 3);
    assert_eq!(store.unit_links().len(), 5);
}
