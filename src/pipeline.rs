//! End-to-end import pipeline
//!
//! Text or file bytes go through tokenizing, header resolution,
//! normalization, operator defaults and validation; the invalid-row policy
//! then decides which records reach the reconciler.

use crate::config::{ImportConfig, InvalidRowPolicy};
use crate::models::{ImportRecord, RecordDefaults};
use crate::parser::{
    HeaderMode, Matrix, apply_defaults, normalize_rows, parse_upload, resolve_headers,
    resolve_with_headers, tokenize,
};
use crate::reconciler::{ReconcileOptions, ReconcileSummary, reconcile};
use crate::store::RecordStore;
use crate::validation::{ValidationReport, validate};
use crate::{ImportError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Parsed and validated input, not yet written anywhere
#[derive(Debug, Clone, Serialize)]
pub struct ParsedImport {
    pub header_mode: HeaderMode,
    pub records: Vec<ImportRecord>,
    pub report: ValidationReport,
}

/// Result of a completed import
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Records handed to the reconciler
    pub imported_records: usize,
    /// Invalid records left out under the skip policy
    pub skipped_invalid: usize,
    pub summary: ReconcileSummary,
}

#[derive(Debug, Clone, Default)]
pub struct ImportPipeline {
    config: ImportConfig,
    defaults: RecordDefaults,
    headers: Option<Vec<String>>,
}

impl ImportPipeline {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            defaults: RecordDefaults::default(),
            headers: None,
        }
    }

    /// Values applied to records that lack a qualification or RTO
    pub fn with_defaults(mut self, defaults: RecordDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Use a fixed header list instead of detecting one
    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Reconcile options carrying the configured batch size and name policy
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions::default()
            .with_batch_size(self.config.batch_size)
            .with_name_policy(self.config.name_policy)
    }

    /// Parse pasted text
    pub fn parse_text(&self, text: &str) -> Result<ParsedImport> {
        let matrix = tokenize(text)?;
        Ok(self.process_matrix(&matrix))
    }

    /// Parse an uploaded CSV file
    pub fn parse_upload(&self, bytes: &[u8]) -> Result<ParsedImport> {
        let matrix = parse_upload(bytes)?;
        Ok(self.process_matrix(&matrix))
    }

    fn process_matrix(&self, matrix: &Matrix) -> ParsedImport {
        let resolution = match &self.headers {
            Some(headers) => resolve_with_headers(matrix, headers),
            None => resolve_headers(matrix),
        };
        debug!(
            "Header mode {:?}, {} data rows",
            resolution.mode,
            matrix.len().saturating_sub(resolution.data_start)
        );

        let mut records = normalize_rows(matrix, &resolution);
        apply_defaults(&mut records, &self.defaults);
        let report = validate(&records);

        if !report.is_valid() {
            warn!(
                "{} validation errors across {} rows",
                report.errors.len(),
                report.invalid_rows()
            );
        }

        ParsedImport {
            header_mode: resolution.mode,
            records,
            report,
        }
    }

    /// Records the invalid-row policy lets through
    ///
    /// # Errors
    ///
    /// [`ImportError::ValidationFailed`] under the abort policy when any row
    /// is invalid, and [`ImportError::NoImportableRows`] when no row is valid,
    /// whatever the policy.
    pub fn importable(&self, parsed: &ParsedImport) -> Result<Vec<ImportRecord>> {
        if self.config.invalid_rows == InvalidRowPolicy::Abort && !parsed.report.is_valid() {
            return Err(ImportError::ValidationFailed {
                count: parsed.report.errors.len(),
            });
        }

        let valid = parsed.report.valid_records(&parsed.records);
        if valid.is_empty() {
            return Err(ImportError::NoImportableRows {
                rows: parsed.records.len(),
                invalid: parsed.report.invalid_rows(),
            });
        }

        match self.config.invalid_rows {
            InvalidRowPolicy::Include => Ok(parsed.records.clone()),
            InvalidRowPolicy::Skip | InvalidRowPolicy::Abort => Ok(valid),
        }
    }

    /// Reconcile the importable records into a store
    pub async fn import(
        &self,
        parsed: &ParsedImport,
        store: &dyn RecordStore,
        options: &ReconcileOptions,
    ) -> Result<ImportOutcome> {
        let records = self.importable(parsed)?;
        let skipped_invalid = parsed.records.len() - records.len();

        info!(
            "Importing {} records ({} invalid left out)",
            records.len(),
            skipped_invalid
        );
        // Units on rows left out still count as present for cleanup
        let options = options.clone().with_import_units(
            options
                .import_units
                .iter()
                .cloned()
                .chain(parsed.records.iter().map(|r| r.unit_code.clone())),
        );
        let summary = reconcile(&records, store, &options).await?;

        Ok(ImportOutcome {
            imported_records: records.len(),
            skipped_invalid,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const PASTE: &str = "Unit Code,Unit Name,Description,Type\n\
BSBCRT311,Apply critical thinking,Critical thinking,Core\n\
BSBXCM301,Engage in workplace communication,Communication,\n";

    fn defaults() -> RecordDefaults {
        RecordDefaults {
            qualification_code: Some("bsb30120".to_string()),
            qualification_name: Some("Certificate III in Business".to_string()),
            rto_code: None,
        }
    }

    #[test]
    fn test_parse_applies_defaults_before_validation() {
        let pipeline = ImportPipeline::default().with_defaults(defaults());
        let parsed = pipeline.parse_text(PASTE).unwrap();

        assert_eq!(parsed.header_mode, HeaderMode::Header);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].qualification_code, "BSB30120");
        assert_eq!(
            parsed.report.messages(),
            vec!["Row 3: unit_type must be Core or Elective"]
        );
    }

    #[test]
    fn test_invalid_row_policies() {
        let parsed = ImportPipeline::default()
            .with_defaults(defaults())
            .parse_text(PASTE)
            .unwrap();

        let skip = ImportPipeline::default();
        assert_eq!(skip.importable(&parsed).unwrap().len(), 1);

        let include = ImportPipeline::new(
            ImportConfig::default().with_invalid_rows(InvalidRowPolicy::Include),
        );
        assert_eq!(include.importable(&parsed).unwrap().len(), 2);

        let abort = ImportPipeline::new(
            ImportConfig::default().with_invalid_rows(InvalidRowPolicy::Abort),
        );
        assert!(matches!(
            abort.importable(&parsed),
            Err(ImportError::ValidationFailed { count: 1 })
        ));
        // Including invalid rows still needs at least one valid row
        let all_invalid = ImportPipeline::default()
            .with_defaults(defaults())
            .parse_text("Unit Code,Unit Name,Description,Type\nU1,Name,,Core\nU2,Name2,,Core\n")
            .unwrap();
        assert_eq!(all_invalid.report.invalid_rows(), 2);
        assert!(matches!(
            include.importable(&all_invalid),
            Err(ImportError::NoImportableRows { rows: 2, invalid: 2 })
        ));
    }

    #[test]
    fn test_no_importable_rows() {
        let pipeline = ImportPipeline::default();
        // No qualification columns and no defaults: every row is invalid
        let parsed = pipeline.parse_text(PASTE).unwrap();

        assert!(matches!(
            pipeline.importable(&parsed),
            Err(ImportError::NoImportableRows { rows: 2, invalid: 2 })
        ));
    }

    #[test]
    fn test_format_errors_block_parsing() {
        let err = ImportPipeline::default()
            .parse_text("a\tb\nc\td\n")
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_predefined_headers() {
        let pipeline = ImportPipeline::default()
            .with_defaults(defaults())
            .with_headers(vec![
                "unit_code".into(),
                "unit_name".into(),
                "unit_description".into(),
                "unit_type".into(),
            ]);
        let parsed = pipeline
            .parse_text("U1,Name,Desc,Elective\n")
            .unwrap();

        assert_eq!(parsed.header_mode, HeaderMode::Predefined);
        assert!(parsed.report.is_valid());
    }

    #[tokio::test]
    async fn test_import_skips_invalid_rows() {
        let store = InMemoryStore::new();
        let pipeline = ImportPipeline::default().with_defaults(defaults());
        let parsed = pipeline.parse_text(PASTE).unwrap();

        let outcome = pipeline
            .import(&parsed, &store, &pipeline.reconcile_options())
            .await
            .unwrap();

        assert_eq!(outcome.imported_records, 1);
        assert_eq!(outcome.skipped_invalid, 1);
        assert_eq!(outcome.summary.created.units, 1);
        assert_eq!(store.units()[0].code, "BSBCRT311");
    }
}
