//! Function command: run the serverless entry point locally
//!
//! Blob storage is a directory tree under the blob root and the record store
//! is the configured SQLite database.

use super::shared::{load_configuration, print_json};
use crate::blob::FsBlobStore;
use crate::cli::args::{FunctionArgs, OutputFormat};
use crate::function::ImportFunction;
use crate::store::SqliteStore;
use crate::{ImportError, Result};
use colored::Colorize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Request body from `--request`, or assembled from the flags
async fn request_body(args: &FunctionArgs) -> Result<Vec<u8>> {
    if let Some(path) = &args.request {
        return Ok(tokio::fs::read(path).await?);
    }
    let body = json!({
        "bucket": args.bucket,
        "path": args.path,
        "companyId": args.company_id,
        "dry_run": args.dry_run,
    });
    Ok(serde_json::to_vec(&body)?)
}

pub async fn run_function(args: FunctionArgs) -> Result<()> {
    args.common.validate()?;
    let mut config = load_configuration(&args.common)?;
    if let Some(root) = &args.blob_root {
        config = config.with_blob_root(root.clone());
    }
    if let Some(database) = &args.database {
        config = config.with_database_path(database.clone());
    }

    let store = SqliteStore::open(&config.database_path).map_err(|e| {
        ImportError::configuration(format!(
            "Cannot open database {}: {}",
            config.database_path.display(),
            e
        ))
    })?;
    debug!("Serving blobs from {}", config.blob_root.display());

    let function = ImportFunction::new(
        Arc::new(FsBlobStore::new(&config.blob_root)),
        Arc::new(store),
    )
    .with_batch_size(config.batch_size);

    let response = function.handle(&request_body(&args).await?).await;

    match args.common.output_format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Human => {
            let status = response.status.to_string();
            let status = if response.status == 200 {
                status.green()
            } else {
                status.red()
            };
            println!("{} {}", "Status".bold(), status);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
    }

    if response.status == 200 {
        Ok(())
    } else {
        Err(ImportError::FunctionStatus {
            status: response.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Args, Commands};
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn function_args(argv: &[&str]) -> FunctionArgs {
        let Some(Commands::Function(args)) = Args::try_parse_from(argv).unwrap().command else {
            panic!("expected function command");
        };
        args
    }

    #[tokio::test]
    async fn test_request_from_flags() {
        let argv = [
            "rto-importer",
            "function",
            "--bucket",
            "imports",
            "--path",
            "units.csv",
            "--company-id",
            "c-1",
            "--dry-run",
        ];
        let args = function_args(&argv);

        let body: serde_json::Value =
            serde_json::from_slice(&request_body(&args).await.unwrap()).unwrap();
        assert_eq!(body["bucket"], "imports");
        assert_eq!(body["companyId"], "c-1");
        assert_eq!(body["dry_run"], true);
    }

    #[tokio::test]
    async fn test_request_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"bucket":"imports","path":"2024/units.csv"}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let args = function_args(&["rto-importer", "function", "--request", &path]);

        let body: serde_json::Value =
            serde_json::from_slice(&request_body(&args).await.unwrap()).unwrap();
        assert_eq!(body["path"], "2024/units.csv");
        assert!(body.get("companyId").is_none());

        let missing = function_args(&["rto-importer", "function", "--request", "/no/such/request.json"]);
        assert!(matches!(request_body(&missing).await, Err(ImportError::Io(_))));
    }
}
