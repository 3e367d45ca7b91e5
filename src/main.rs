use clap::Parser;
use rail_dataset_manager::DatasetError;
use rail_dataset_manager::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }
    let json_errors = args.global.is_json();

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        // Ctrl+C only cancels; the command decides where it is safe to stop,
        // so an upload interrupted before activation can remove what it stored.
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nReceived CTRL+C, stopping at the next safe point...");
                signal_token.cancel();
            }
        });

        commands::run(args, cancellation_token).await
    });

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            if json_errors {
                let kind = error
                    .downcast_ref::<DatasetError>()
                    .map(|e| e.kind().as_str())
                    .unwrap_or("internal");
                println!(
                    "{}",
                    serde_json::json!({ "error": format!("{:#}", error), "kind": kind })
                );
            }
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Rail Datasets - Railway Dataset Version & Archive Manager");
    println!("=========================================================");
    println!();
    println!("Replace the railway dataset served by the dashboard, keep every earlier");
    println!("dataset as an archive, and switch between them atomically.");
    println!();
    println!("USAGE:");
    println!("    rail-datasets <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    upload      Validate and activate a new dataset");
    println!("    list        List every stored dataset, newest first");
    println!("    revert      Restore the previous (or a named) dataset");
    println!("    apply       Make a specific archived dataset current");
    println!("    delete      Delete an archived dataset");
    println!("    clear       Delete every archive except default and current");
    println!("    info        Show the dataset currently being served");
    println!("    gc          Remove storage left behind by interrupted uploads");
    println!();
    println!("OPTIONS:");
    println!("    --data-root <PATH>    Archive store directory");
    println!("    --format <FORMAT>     human or json");
    println!("    -h, --help            Show help information");
    println!("    -V, --version         Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Upload a full dataset:");
    println!("    rail-datasets upload --stations stations.csv --archive days.zip --name \"May 2024\"");
    println!();
    println!("    # Replace only the station table:");
    println!("    rail-datasets upload --stations stations.csv");
    println!();
    println!("    # Go back to the previous dataset:");
    println!("    rail-datasets revert");
    println!();
    println!("For detailed help on any command, use:");
    println!("    rail-datasets <COMMAND> --help");
}
