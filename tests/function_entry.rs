//! Status contract of the serverless import entry point

use async_trait::async_trait;
use rto_importer::blob::{BlobStore, FsBlobStore};
use rto_importer::function::ImportFunction;
use rto_importer::store::InMemoryStore;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

const UPLOAD: &str = "\u{feff}RTO Code,Qualification Code,Qualification Name,Unit Code,Unit Name,Unit Type,Stream\n\
90001,bsb30120,Cert III Business,BSBWHS311,WHS Participation,Core,Finance\n\
90001,BSB30120,Cert III Business,BSBFIN301,Process financial transactions,Elective,Finance\n\
90002,BSB40120,Cert IV Business,BSBWHS311,WHS Participation,Core,\n\
,,,,Notes row without codes,,\n";

/// Blobs keyed by `bucket/path`
#[derive(Default)]
struct MemoryBlobs {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryBlobs {
    fn with_file(bucket: &str, path: &str, contents: &str) -> Self {
        let mut files = HashMap::new();
        files.insert(format!("{bucket}/{path}"), contents.as_bytes().to_vec());
        Self { files }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn download(&self, bucket: &str, path: &str) -> rto_importer::Result<Option<Vec<u8>>> {
        Ok(self.files.get(&format!("{bucket}/{path}")).cloned())
    }
}

fn function(blobs: MemoryBlobs) -> (ImportFunction, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (ImportFunction::new(Arc::new(blobs), store.clone()), store)
}

fn body(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

#[tokio::test]
async fn test_import_creates_rtos_offers_and_links() {
    let (function, store) = function(MemoryBlobs::with_file("imports", "units.csv", UPLOAD));

    let response = function
        .handle(&body(json!({"bucket": "imports", "path": "units.csv", "companyId": "c-1"})))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({
            "ok": true,
            "summary": {
                "rows": 3,
                "quals_seen": 2,
                "units_seen": 2,
                "rtos_seen": 2,
                "offers_inserted": 2
            }
        })
    );
    assert_eq!(store.rtos().len(), 2);
    assert!(store.offers().iter().all(|o| o.company_id.as_deref() == Some("c-1")));
    assert_eq!(store.unit_links().len(), 3);
    // Stream columns are ignored by the entry point
    assert!(store.streams().is_empty());
    assert_eq!(store.call_count("select_streams"), 0);
}

#[tokio::test]
async fn test_second_upload_inserts_no_offers() {
    let (function, store) = function(MemoryBlobs::with_file("imports", "units.csv", UPLOAD));
    let request = body(json!({"bucket": "imports", "path": "units.csv"}));

    function.handle(&request).await;
    let response = function.handle(&request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["summary"]["offers_inserted"], 0);
    assert_eq!(store.offers().len(), 2);
    assert_eq!(store.qualifications().len(), 2);
}

#[tokio::test]
async fn test_existing_names_are_never_overwritten() {
    let (function, store) = function(MemoryBlobs::with_file("imports", "units.csv", UPLOAD));
    function
        .handle(&body(json!({"bucket": "imports", "path": "units.csv"})))
        .await;

    let renamed = UPLOAD.replace("Cert III Business", "Certificate III in Business");
    let (second, _) = function_with_store(
        MemoryBlobs::with_file("imports", "units.csv", &renamed),
        store.clone(),
    );
    second
        .handle(&body(json!({"bucket": "imports", "path": "units.csv"})))
        .await;

    let names: Vec<String> = store.qualifications().into_iter().map(|q| q.name).collect();
    assert!(names.contains(&"Cert III Business".to_string()));
}

fn function_with_store(
    blobs: MemoryBlobs,
    store: Arc<InMemoryStore>,
) -> (ImportFunction, Arc<InMemoryStore>) {
    (ImportFunction::new(Arc::new(blobs), store.clone()), store)
}

#[tokio::test]
async fn test_dry_run_makes_no_store_calls() {
    let (function, store) = function(MemoryBlobs::with_file("imports", "units.csv", UPLOAD));

    let response = function
        .handle(&body(
            json!({"bucket": "imports", "path": "units.csv", "dry_run": true}),
        ))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["dry_run"], true);
    assert_eq!(response.body["summary"]["rows"], 3);
    assert_eq!(response.body["summary"]["quals_seen"], 2);
    assert!(response.body["summary"].get("offers_inserted").is_none());
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_missing_bucket_or_path() {
    let (function, store) = function(MemoryBlobs::default());

    for request in [
        b"{}".to_vec(),
        b"not json".to_vec(),
        Vec::new(),
        body(json!({"bucket": "imports"})),
        body(json!({"bucket": " ", "path": "units.csv"})),
    ] {
        let response = function.handle(&request).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body, json!({"error": "bucket and path required"}));
    }
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_missing_file() {
    let (function, _) = function(MemoryBlobs::default());

    let response = function
        .handle(&body(json!({"bucket": "imports", "path": "nope.csv"})))
        .await;

    assert_eq!(response.status, 404);
    assert_eq!(response.body, json!({"error": "File not found"}));
}

#[tokio::test]
async fn test_no_rows_with_codes() {
    let (function, store) = function(MemoryBlobs::with_file(
        "imports",
        "empty.csv",
        "Unit Code,Unit Name\n,Only a name\n",
    ));

    let response = function
        .handle(&body(json!({"bucket": "imports", "path": "empty.csv"})))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"ok": true, "summary": {"rows": 0}}));
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_store_failure_is_500() {
    let (function, store) = function(MemoryBlobs::with_file("imports", "units.csv", UPLOAD));
    store.fail_on("insert_offers", "permission denied");

    let response = function
        .handle(&body(json!({"bucket": "imports", "path": "units.csv"})))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(
        response.body["error"],
        "offer phase failed: insert_offers: permission denied"
    );
}

#[tokio::test]
async fn test_filesystem_blobs() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("imports/2024")).unwrap();
    std::fs::write(dir.path().join("imports/2024/units.csv"), UPLOAD).unwrap();
    let store = Arc::new(InMemoryStore::new());
    let function = ImportFunction::new(Arc::new(FsBlobStore::new(dir.path())), store.clone());

    let ok = function
        .handle(&body(json!({"bucket": "imports", "path": "2024/units.csv"})))
        .await;
    assert_eq!(ok.status, 200);

    let escape = function
        .handle(&body(json!({"bucket": "imports", "path": "../../etc/passwd"})))
        .await;
    assert_eq!(escape.status, 400);
}
