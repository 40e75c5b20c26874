//! Check command: parse and validate without writing

use super::shared::{build_pipeline, load_configuration, print_validation_report, read_input};
use crate::Result;
use crate::cli::args::CheckArgs;
use tracing::info;

pub async fn run_check(args: CheckArgs) -> Result<()> {
    args.common.validate()?;
    args.input.validate()?;

    let config = load_configuration(&args.common)?;
    let source = read_input(&args.input).await?;
    let pipeline = build_pipeline(config, &args.input);
    let parsed = source.parse(&pipeline)?;

    info!(
        "Checked {} rows, {} errors",
        parsed.records.len(),
        parsed.report.errors.len()
    );
    print_validation_report(&parsed, args.common.output_format)
}
