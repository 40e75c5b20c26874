//! Command-line argument definitions for the RTO importer
//!
//! Defines the CLI using the clap derive API. Every subcommand shares the
//! logging and configuration flags in [`CommonArgs`].

use crate::config::{InvalidRowPolicy, NameUpdatePolicy};
use crate::constants::LAST_PASTE_DRAFT;
use crate::models::RecordDefaults;
use crate::parser::field_parsers::normalize_code;
use crate::reconciler::{LinkScope, SaveMode};
use crate::{ImportError, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the RTO qualification importer
///
/// Reads pasted grids or CSV files describing qualifications and their
/// units, validates them and reconciles them into the local database.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rto-importer",
    version,
    about = "Import RTO qualification and unit data from pasted grids or CSV files",
    long_about = "Parses loosely structured spreadsheet text (quoted CSV, optional header row) into \
                  qualification, unit, stream and offer records, reports row-level problems, and \
                  upserts the records into a SQLite database without duplicating anything on re-import."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Parse and validate input without writing anything
    Check(CheckArgs),
    /// Parse, validate and reconcile input into the database
    Import(ImportArgs),
    /// Run the serverless import entry point against a local blob root
    Function(FunctionArgs),
    /// Show or clear the saved paste draft
    Draft(DraftArgs),
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct CommonArgs {
    /// Path to a JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Where input comes from and how it is read
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct InputArgs {
    /// CSV file to read; pasted text is read from stdin when omitted or `-`
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Read the file with the pasted-grid tokenizer instead of the CSV reader
    #[arg(long = "paste")]
    pub paste: bool,

    /// Fixed header list (comma-separated) used instead of detecting one
    #[arg(long = "headers", value_name = "LIST", value_delimiter = ',')]
    pub headers: Option<Vec<String>>,

    /// Qualification code for rows that carry none
    #[arg(long = "qualification", value_name = "CODE")]
    pub qualification_code: Option<String>,

    /// Qualification name for rows that carry none
    #[arg(long = "qualification-name", value_name = "NAME")]
    pub qualification_name: Option<String>,

    /// RTO code for rows that carry none
    #[arg(long = "rto", value_name = "CODE")]
    pub rto_code: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Parser)]
pub struct ImportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Import the saved paste draft instead of reading input
    #[arg(long = "from-draft", conflicts_with = "input")]
    pub from_draft: bool,

    /// Attach units and streams to qualifications or to RTO offers
    #[arg(long = "scope", value_enum, default_value = "qualification")]
    pub scope: ScopeArg,

    /// Save every row into this variation, replacing its unit list
    #[arg(long = "variation", value_name = "NAME")]
    pub variation: Option<String>,

    /// Ensure an offer exists for each (RTO, qualification) pair
    #[arg(long = "link-offers")]
    pub link_offers: bool,

    /// Company stamped on offers created by the import
    #[arg(long = "company-id", value_name = "ID")]
    pub company_id: Option<String>,

    /// Skip stream creation and stream links
    #[arg(long = "no-streams")]
    pub no_streams: bool,

    /// What to do with rows that fail validation
    #[arg(long = "invalid-rows", value_enum)]
    pub invalid_rows: Option<InvalidRowsArg>,

    /// When existing names may be overwritten
    #[arg(long = "name-policy", value_enum)]
    pub name_policy: Option<NamePolicyArg>,

    /// Rows per store write
    #[arg(long = "batch-size", value_name = "ROWS")]
    pub batch_size: Option<usize>,

    /// SQLite database path
    #[arg(long = "database", value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Validate and report without writing
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Parser)]
pub struct FunctionArgs {
    /// Bucket directory under the blob root
    #[arg(long = "bucket")]
    pub bucket: Option<String>,

    /// File path inside the bucket
    #[arg(long = "path")]
    pub path: Option<String>,

    #[arg(long = "company-id", value_name = "ID")]
    pub company_id: Option<String>,

    /// Report counts without touching the database
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Raw JSON request body file, used instead of the flags above
    #[arg(long = "request", value_name = "FILE", conflicts_with_all = ["bucket", "path"])]
    pub request: Option<PathBuf>,

    /// Local directory standing in for blob storage
    #[arg(long = "blob-root", value_name = "DIR")]
    pub blob_root: Option<PathBuf>,

    #[arg(long = "database", value_name = "FILE")]
    pub database: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Parser)]
pub struct DraftArgs {
    #[arg(value_enum, default_value = "show")]
    pub action: DraftAction,

    #[arg(long = "name", default_value = LAST_PASTE_DRAFT)]
    pub name: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON format for scripting
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Qualification,
    Offer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InvalidRowsArg {
    Skip,
    Include,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamePolicyArg {
    PreferNewest,
    FillIfBlank,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DraftAction {
    Show,
    Clear,
}

impl From<ScopeArg> for LinkScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Qualification => LinkScope::Qualification,
            ScopeArg::Offer => LinkScope::Offer,
        }
    }
}

impl From<InvalidRowsArg> for InvalidRowPolicy {
    fn from(arg: InvalidRowsArg) -> Self {
        match arg {
            InvalidRowsArg::Skip => InvalidRowPolicy::Skip,
            InvalidRowsArg::Include => InvalidRowPolicy::Include,
            InvalidRowsArg::Abort => InvalidRowPolicy::Abort,
        }
    }
}

impl From<NamePolicyArg> for NameUpdatePolicy {
    fn from(arg: NamePolicyArg) -> Self {
        match arg {
            NamePolicyArg::PreferNewest => NameUpdatePolicy::PreferNewest,
            NamePolicyArg::FillIfBlank => NameUpdatePolicy::FillIfBlank,
            NamePolicyArg::Never => NameUpdatePolicy::Never,
        }
    }
}

impl Args {
    pub fn common(&self) -> Option<&CommonArgs> {
        self.command.as_ref().map(|command| match command {
            Commands::Check(args) => &args.common,
            Commands::Import(args) => &args.common,
            Commands::Function(args) => &args.common,
            Commands::Draft(args) => &args.common,
        })
    }
}

impl CommonArgs {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Spinners only in human output outside quiet mode
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(ImportError::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }
        Ok(())
    }
}

impl InputArgs {
    /// Whether input comes from stdin rather than a file
    pub fn reads_stdin(&self) -> bool {
        self.input
            .as_ref()
            .is_none_or(|path| path.as_os_str() == "-")
    }

    /// Operator defaults from the flags; blank values count as absent
    pub fn defaults(&self) -> RecordDefaults {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        RecordDefaults {
            qualification_code: text(&self.qualification_code).map(|c| normalize_code(&c)),
            qualification_name: text(&self.qualification_name),
            rto_code: text(&self.rto_code).map(|c| normalize_code(&c)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(input) = self.input.as_ref().filter(|_| !self.reads_stdin()) {
            if !input.is_file() {
                return Err(ImportError::configuration(format!(
                    "Input file does not exist: {}",
                    input.display()
                )));
            }
        }
        if let Some(headers) = &self.headers {
            if headers.iter().all(|h| h.trim().is_empty()) {
                return Err(ImportError::configuration("Header list cannot be empty"));
            }
        }
        Ok(())
    }
}

impl ImportArgs {
    pub fn validate(&self) -> Result<()> {
        self.common.validate()?;
        if !self.from_draft {
            self.input.validate()?;
        }
        if self.batch_size == Some(0) {
            return Err(ImportError::configuration(
                "Batch size must be greater than 0",
            ));
        }
        if self
            .variation
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ImportError::configuration("Variation name cannot be empty"));
        }
        Ok(())
    }

    pub fn save_mode(&self) -> SaveMode {
        match &self.variation {
            Some(name) => SaveMode::Variation(name.trim().to_string()),
            None => SaveMode::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rto-importer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_import_flags() {
        let args = parse(&[
            "import",
            "-",
            "--scope",
            "offer",
            "--variation",
            " Finance ",
            "--rto",
            " 90001 ",
            "--name-policy",
            "fill-if-blank",
            "-vv",
        ]);
        let Some(Commands::Import(import)) = args.command else {
            panic!("expected import command");
        };

        assert!(import.input.reads_stdin());
        assert_eq!(LinkScope::from(import.scope), LinkScope::Offer);
        assert_eq!(import.save_mode(), SaveMode::Variation("Finance".to_string()));
        assert_eq!(import.input.defaults().rto_code.as_deref(), Some("90001"));
        assert_eq!(
            import.name_policy.map(NameUpdatePolicy::from),
            Some(NameUpdatePolicy::FillIfBlank)
        );
        assert_eq!(import.common.get_log_level(), "debug");
        assert!(import.validate().is_ok());
    }

    #[test]
    fn test_headers_list() {
        let args = parse(&["check", "--headers", "unit_code,unit_name,unit_type"]);
        let Some(Commands::Check(check)) = args.command else {
            panic!("expected check command");
        };
        assert_eq!(
            check.input.headers.unwrap(),
            vec!["unit_code", "unit_name", "unit_type"]
        );
    }

    #[test]
    fn test_invalid_import_args() {
        let args = parse(&["import", "--batch-size", "0"]);
        let Some(Commands::Import(import)) = args.command else {
            panic!("expected import command");
        };
        assert!(import.validate().is_err());

        let args = parse(&["import", "/nonexistent/units.csv"]);
        let Some(Commands::Import(import)) = args.command else {
            panic!("expected import command");
        };
        assert!(import.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut common = CommonArgs::default();
        assert_eq!(common.get_log_level(), "warn");

        common.verbose = 1;
        assert_eq!(common.get_log_level(), "info");

        common.verbose = 3;
        assert_eq!(common.get_log_level(), "trace");

        common.quiet = true;
        assert_eq!(common.get_log_level(), "error");
        assert!(!common.show_progress());
    }

    #[test]
    fn test_draft_defaults_to_last_paste() {
        let args = parse(&["draft"]);
        let Some(Commands::Draft(draft)) = args.command else {
            panic!("expected draft command");
        };
        assert_eq!(draft.action, DraftAction::Show);
        assert_eq!(draft.name, LAST_PASTE_DRAFT);
    }
}
