//! Import command: parse, validate and reconcile into the database

use super::shared::{
    InputSource, build_pipeline, create_spinner, load_configuration, print_outcome,
    print_validation_report, read_input,
};
use crate::cli::args::ImportArgs;
use crate::config::ImportConfig;
use crate::constants::LAST_PASTE_DRAFT;
use crate::draft::{Draft, DraftStore};
use crate::models::RecordDefaults;
use crate::store::SqliteStore;
use crate::{ImportError, Result};
use colored::Colorize;
use tracing::{info, warn};

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_cli_overrides(config: ImportConfig, args: &ImportArgs) -> Result<ImportConfig> {
    let mut config = config;
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(policy) = args.name_policy {
        config = config.with_name_policy(policy.into());
    }
    if let Some(policy) = args.invalid_rows {
        config = config.with_invalid_rows(policy.into());
    }
    if let Some(database) = &args.database {
        config = config.with_database_path(database.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Flag defaults win; the draft fills whatever the flags leave out
fn merge_defaults(flags: RecordDefaults, saved: RecordDefaults) -> RecordDefaults {
    RecordDefaults {
        qualification_code: flags.qualification_code.or(saved.qualification_code),
        qualification_name: flags.qualification_name.or(saved.qualification_name),
        rto_code: flags.rto_code.or(saved.rto_code),
    }
}

/// Input and operator defaults, from the saved draft or from the flags
async fn resolve_input(
    args: &ImportArgs,
    drafts: &DraftStore,
) -> Result<(InputSource, RecordDefaults)> {
    if !args.from_draft {
        return Ok((read_input(&args.input).await?, args.input.defaults()));
    }

    let draft = drafts.load(LAST_PASTE_DRAFT).await?.ok_or_else(|| {
        ImportError::configuration(format!(
            "No saved draft in {}",
            drafts.dir().display()
        ))
    })?;
    info!("Importing draft saved at {}", draft.saved_at.to_rfc3339());
    let defaults = merge_defaults(args.input.defaults(), draft.defaults());
    Ok((InputSource::Paste(draft.paste_text), defaults))
}

pub async fn run_import(args: ImportArgs) -> Result<()> {
    args.validate()?;
    let config = apply_cli_overrides(load_configuration(&args.common)?, &args)?;
    let drafts = DraftStore::new(&config.draft_dir);

    let (source, defaults) = resolve_input(&args, &drafts).await?;
    let database_path = config.database_path.clone();
    let pipeline = build_pipeline(config, &args.input).with_defaults(defaults.clone());
    let parsed = source.parse(&pipeline)?;

    if let (Some(text), false) = (source.paste_text(), args.from_draft) {
        if let Err(e) = drafts.save(LAST_PASTE_DRAFT, &Draft::new(text, &defaults)).await {
            warn!("Could not save paste draft: {}", e);
        }
    }

    print_validation_report(&parsed, args.common.output_format)?;
    if args.dry_run {
        if args.common.show_progress() {
            println!("{}", "Dry run: nothing written".dimmed());
        }
        return Ok(());
    }

    let store = SqliteStore::open(&database_path).map_err(|e| {
        ImportError::configuration(format!(
            "Cannot open database {}: {}",
            database_path.display(),
            e
        ))
    })?;

    let mut options = pipeline
        .reconcile_options()
        .with_scope(args.scope.into())
        .with_mode(args.save_mode())
        .with_company_id(args.company_id.clone());
    if args.link_offers {
        options = options.with_offer_linking();
    }
    if args.no_streams {
        options = options.without_streams();
    }

    let spinner = args
        .common
        .show_progress()
        .then(|| create_spinner("Reconciling records"));
    let result = pipeline.import(&parsed, &store, &options).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let outcome = result?;
    print_outcome(&outcome, args.common.output_format)
}
