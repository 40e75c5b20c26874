use clap::Parser;
use rto_importer::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let shutdown_signal = async {
            // Without a signal handler, never resolve and let the command finish
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = commands::run(args) => result,
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, stopping import...");
                Err(rto_importer::ImportError::interrupted(
                    "Import interrupted by user; re-running it is safe",
                ))
            }
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("RTO Importer - Qualification and Unit Data Import");
    println!("=================================================");
    println!();
    println!("Import qualification, unit, stream and offer data from pasted");
    println!("spreadsheet grids or CSV files into the local database.");
    println!();
    println!("USAGE:");
    println!("    rto-importer <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    check       Parse and validate input without writing anything");
    println!("    import      Parse, validate and reconcile input into the database");
    println!("    function    Run the serverless import entry point against a local blob root");
    println!("    draft       Show or clear the saved paste draft");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Validate a CSV export:");
    println!("    rto-importer check units.csv");
    println!();
    println!("    # Import a pasted unit grid for one qualification:");
    println!("    pbpaste | rto-importer import --qualification BSB30120 \\");
    println!("                                  --qualification-name \"Certificate III in Business\"");
    println!();
    println!("    # Save a pasted grid as a variation of an RTO offer:");
    println!("    rto-importer import grid.txt --paste --scope offer --rto 90001 --variation Finance");
    println!();
    println!("    # Import an uploaded file the way the serverless function does:");
    println!("    rto-importer function --bucket imports --path 2024/units.csv --dry-run");
    println!();
    println!("For detailed help on any command, use:");
    println!("    rto-importer <COMMAND> --help");
}
