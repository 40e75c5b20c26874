//! Command implementations for the RTO importer CLI
//!
//! Each subcommand lives in its own module; [`shared`] holds logging setup,
//! configuration loading and report printing.

pub mod check;
pub mod draft;
pub mod function;
pub mod import;
pub mod shared;

use crate::cli::args::{Args, Commands};
use crate::{ImportError, Result};

/// Main command runner
///
/// Installs logging from the subcommand's verbosity flags, then dispatches.
pub async fn run(args: Args) -> Result<()> {
    if let Some(common) = args.common() {
        shared::setup_logging(common)?;
    }

    match args.command {
        Some(Commands::Check(check_args)) => check::run_check(check_args).await,
        Some(Commands::Import(import_args)) => import::run_import(import_args).await,
        Some(Commands::Function(function_args)) => function::run_function(function_args).await,
        Some(Commands::Draft(draft_args)) => draft::run_draft(draft_args).await,
        None => Err(ImportError::configuration("No command given")),
    }
}
