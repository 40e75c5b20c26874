//! Serverless import entry point
//!
//! Accepts a JSON request naming an uploaded CSV in blob storage, imports
//! its rows and answers with an HTTP-style status and JSON body. Only
//! qualifications, units, unit links, RTOs and offers are written; stream
//! columns are ignored and existing names are never overwritten.

use crate::blob::BlobStore;
use crate::config::NameUpdatePolicy;
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::models::ImportRecord;
use crate::parser::{normalize_rows, parse_upload, resolve_headers};
use crate::reconciler::{ReconcileOptions, reconcile};
use crate::store::RecordStore;
use crate::{ImportError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionRequest {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "companyId")]
    pub company_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Status code and JSON body returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionResponse {
    pub status: u16,
    pub body: Value,
}

impl FunctionResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

/// Counts reported by the entry point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionSummary {
    pub rows: usize,
    pub quals_seen: usize,
    pub units_seen: usize,
    pub rtos_seen: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers_inserted: Option<usize>,
}

impl FunctionSummary {
    fn from_records(records: &[ImportRecord]) -> Self {
        let distinct = |values: Vec<&str>| values.into_iter().collect::<HashSet<_>>().len();
        Self {
            rows: records.len(),
            quals_seen: distinct(records.iter().map(|r| r.qualification_code.as_str()).collect()),
            units_seen: distinct(records.iter().map(|r| r.unit_code.as_str()).collect()),
            rtos_seen: distinct(records.iter().filter_map(|r| r.rto_code.as_deref()).collect()),
            offers_inserted: None,
        }
    }
}

/// Import handler over a blob source and a record store
pub struct ImportFunction {
    blobs: Arc<dyn BlobStore>,
    store: Arc<dyn RecordStore>,
    batch_size: usize,
}

impl ImportFunction {
    pub fn new(blobs: Arc<dyn BlobStore>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            blobs,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Handle a raw request body; an unreadable body counts as empty
    pub async fn handle(&self, body: &[u8]) -> FunctionResponse {
        let request = serde_json::from_slice::<FunctionRequest>(body).unwrap_or_else(|e| {
            debug!("Unreadable request body: {}", e);
            FunctionRequest::default()
        });
        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: FunctionRequest) -> FunctionResponse {
        let bucket = request.bucket.as_deref().unwrap_or("").trim();
        let path = request.path.as_deref().unwrap_or("").trim();
        if bucket.is_empty() || path.is_empty() {
            return FunctionResponse::error(400, "bucket and path required");
        }

        match self.run(bucket, path, &request).await {
            Ok(response) => response,
            Err(ImportError::BlobNotFound { .. }) => FunctionResponse::error(404, "File not found"),
            Err(e @ ImportError::InvalidBlobPath { .. }) => FunctionResponse::error(400, e.to_string()),
            Err(e) => {
                error!("Import of {}/{} failed: {}", bucket, path, e);
                FunctionResponse::error(500, e.to_string())
            }
        }
    }

    async fn run(
        &self,
        bucket: &str,
        path: &str,
        request: &FunctionRequest,
    ) -> Result<FunctionResponse> {
        let bytes = self
            .blobs
            .download(bucket, path)
            .await?
            .ok_or_else(|| ImportError::BlobNotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })?;

        let matrix = parse_upload(&bytes)?;
        let records: Vec<ImportRecord> = normalize_rows(&matrix, &resolve_headers(&matrix))
            .into_iter()
            .filter(|r| !r.qualification_code.is_empty() && !r.unit_code.is_empty())
            .collect();

        if records.is_empty() {
            return Ok(FunctionResponse::ok(json!({ "ok": true, "summary": { "rows": 0 } })));
        }

        let mut summary = FunctionSummary::from_records(&records);
        if request.dry_run {
            info!("Dry run of {}/{}: {} rows", bucket, path, summary.rows);
            return Ok(FunctionResponse::ok(json!({
                "ok": true,
                "dry_run": true,
                "summary": summary,
            })));
        }

        let options = ReconcileOptions::default()
            .with_batch_size(self.batch_size)
            .with_name_policy(NameUpdatePolicy::Never)
            .with_company_id(request.company_id.clone())
            .with_offer_linking()
            .without_streams();
        let result = reconcile(&records, self.store.as_ref(), &options).await?;
        summary.offers_inserted = Some(result.created.offers);

        info!(
            "Imported {}/{}: {} rows, {} offers inserted",
            bucket, path, summary.rows, result.created.offers
        );
        Ok(FunctionResponse::ok(json!({ "ok": true, "summary": summary })))
    }
}
