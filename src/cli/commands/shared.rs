//! Shared components for CLI commands
//!
//! Logging setup, configuration loading, input reading and report printing
//! used across the command implementations.

use crate::cli::args::{CommonArgs, InputArgs, OutputFormat};
use crate::config::ImportConfig;
use crate::pipeline::{ImportOutcome, ImportPipeline, ParsedImport};
use crate::{ImportError, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Raw input before tokenizing
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Text pasted on stdin, read with the quoted-grid tokenizer
    Paste(String),
    /// File bytes, read with the CSV reader
    Upload(Vec<u8>),
}

impl InputSource {
    pub fn parse(&self, pipeline: &ImportPipeline) -> Result<ParsedImport> {
        match self {
            InputSource::Paste(text) => pipeline.parse_text(text),
            InputSource::Upload(bytes) => pipeline.parse_upload(bytes),
        }
    }

    /// Pasted text worth keeping as a draft
    pub fn paste_text(&self) -> Option<&str> {
        match self {
            InputSource::Paste(text) => Some(text),
            InputSource::Upload(_) => None,
        }
    }
}

/// Set up structured logging
pub fn setup_logging(args: &CommonArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rto_importer={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .map_err(|e| ImportError::configuration(format!("Failed to set up logging: {}", e)))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| ImportError::configuration(format!("Failed to set up logging: {}", e)))?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration from `--config` or fall back to defaults
pub fn load_configuration(args: &CommonArgs) -> Result<ImportConfig> {
    let config = match &args.config_file {
        Some(path) => ImportConfig::load(path)?,
        None => ImportConfig::default(),
    };
    debug!(
        "Using database {} with batch size {}",
        config.database_path.display(),
        config.batch_size
    );
    Ok(config)
}

/// Read the input file, or pasted text from stdin
pub async fn read_input(args: &InputArgs) -> Result<InputSource> {
    if args.reads_stdin() {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        debug!("Read {} bytes of pasted text from stdin", text.len());
        return Ok(InputSource::Paste(text));
    }

    let Some(path) = &args.input else {
        return Err(ImportError::configuration("No input file given"));
    };
    let bytes = tokio::fs::read(path).await?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    if args.paste {
        let text = String::from_utf8(bytes).map_err(|e| {
            ImportError::configuration(format!("{} is not UTF-8 text: {}", path.display(), e))
        })?;
        Ok(InputSource::Paste(text))
    } else {
        Ok(InputSource::Upload(bytes))
    }
}

/// Pipeline carrying the operator defaults and any fixed header list
pub fn build_pipeline(config: ImportConfig, args: &InputArgs) -> ImportPipeline {
    let pipeline = ImportPipeline::new(config).with_defaults(args.defaults());
    match &args.headers {
        Some(headers) => pipeline.with_headers(headers.clone()),
        None => pipeline,
    }
}

/// Spinner shown while the store is being written
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print validation counts and row errors
pub fn print_validation_report(parsed: &ParsedImport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(parsed);
    }

    let counts = &parsed.report.counts;
    println!("{}", "Validation".bold());
    println!("  Header mode:    {:?}", parsed.header_mode);
    println!("  Rows:           {}", counts.rows);
    println!("  Qualifications: {}", counts.qualifications);
    println!("  Units:          {}", counts.units);
    println!("  Core / Elective: {} / {}", counts.cores, counts.electives);

    if parsed.report.is_valid() {
        println!("  {}", "No errors".green());
    } else {
        println!(
            "  {}",
            format!(
                "{} error(s) in {} row(s)",
                parsed.report.errors.len(),
                parsed.report.invalid_rows()
            )
            .red()
        );
        for message in parsed.report.messages() {
            println!("    {}", message.yellow());
        }
    }
    Ok(())
}

/// Print what a completed import changed
pub fn print_outcome(outcome: &ImportOutcome, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(outcome);
    }

    let s = &outcome.summary;
    println!();
    println!("{}", "Import complete".green().bold());
    println!(
        "  Records imported: {} ({} invalid left out)",
        outcome.imported_records, outcome.skipped_invalid
    );
    println!(
        "  Created:  {} RTOs, {} qualifications, {} units, {} offers, {} streams",
        s.created.rtos, s.created.qualifications, s.created.units, s.created.offers, s.created.streams
    );
    println!(
        "  Links:    {} unit links new, {} refreshed; {} stream links new, {} refreshed",
        s.created.unit_links, s.updated.unit_links, s.created.stream_links, s.updated.stream_links
    );
    println!(
        "  Updated:  {} qualification names, {} units",
        s.updated.qualifications, s.updated.units
    );
    if s.removed.unit_links + s.removed.stream_links > 0 {
        println!(
            "  Removed:  {} unit links, {} stream links",
            s.removed.unit_links, s.removed.stream_links
        );
    }
    if s.skipped.unresolved_records + s.skipped.unresolved_stream_targets > 0 {
        println!(
            "  {}",
            format!(
                "Skipped:  {} unresolved rows, {} unmatched stream targets",
                s.skipped.unresolved_records, s.skipped.unresolved_stream_targets
            )
            .yellow()
        );
    }
    if !s.changed_structure() {
        println!("  {}", "Nothing new; store already up to date".dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_file_input_modes() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Unit Code,Unit Name\nU1,Name\n").unwrap();

        let mut args = InputArgs {
            input: Some(file.path().to_path_buf()),
            ..InputArgs::default()
        };
        assert!(matches!(read_input(&args).await.unwrap(), InputSource::Upload(_)));

        args.paste = true;
        let source = read_input(&args).await.unwrap();
        assert_eq!(source.paste_text(), Some("Unit Code,Unit Name\nU1,Name\n"));
    }

    #[test]
    fn test_pipeline_uses_defaults_and_headers() {
        let args = InputArgs {
            headers: Some(vec!["unit_code".into(), "unit_name".into(), "unit_type".into()]),
            qualification_code: Some(" bsb30120 ".into()),
            ..InputArgs::default()
        };
        let pipeline = build_pipeline(ImportConfig::default(), &args);
        let parsed = InputSource::Paste("U1,Name,Core\n".into())
            .parse(&pipeline)
            .unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].qualification_code, "BSB30120");
        assert_eq!(parsed.records[0].unit_code, "U1");
    }
}
