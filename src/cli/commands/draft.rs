//! Draft command: show or clear a saved paste

use super::shared::{load_configuration, print_json};
use crate::Result;
use crate::cli::args::{DraftAction, DraftArgs, OutputFormat};
use crate::draft::DraftStore;
use colored::Colorize;

pub async fn run_draft(args: DraftArgs) -> Result<()> {
    args.common.validate()?;
    let config = load_configuration(&args.common)?;
    let drafts = DraftStore::new(&config.draft_dir);

    match args.action {
        DraftAction::Show => {
            let draft = drafts.load(&args.name).await?;
            if args.common.output_format == OutputFormat::Json {
                return print_json(&draft);
            }
            match draft {
                Some(draft) => {
                    println!("{} {}", "Draft".bold(), args.name);
                    println!("  Saved:          {}", draft.saved_at.to_rfc3339());
                    println!(
                        "  Qualification:  {} {}",
                        draft.qualification_code.as_deref().unwrap_or("-"),
                        draft.qualification_name.as_deref().unwrap_or("")
                    );
                    println!("  RTO:            {}", draft.rto_code.as_deref().unwrap_or("-"));
                    println!("  Lines:          {}", draft.paste_text.lines().count());
                    println!();
                    println!("{}", draft.paste_text);
                }
                None => println!("{}", format!("No draft named '{}'", args.name).dimmed()),
            }
        }
        DraftAction::Clear => {
            if drafts.clear(&args.name).await? {
                println!("Cleared draft '{}'", args.name);
            } else {
                println!("{}", format!("No draft named '{}'", args.name).dimmed());
            }
        }
    }
    Ok(())
}
