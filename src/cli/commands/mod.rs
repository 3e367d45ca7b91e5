//! Command implementations for the dataset manager CLI
//!
//! Each subcommand opens the version manager from the resolved configuration,
//! runs one operation and reports the outcome in the requested format.

pub mod archives;
pub mod info;
pub mod shared;
pub mod upload;

use crate::cli::args::{Args, Commands};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Dispatch to the subcommand handler
///
/// Logging is initialized here so every command shares the same setup.
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    shared::setup_logging(&args.global)?;

    let Args { command, global } = args;
    match command.unwrap_or(Commands::Info) {
        Commands::Upload(upload_args) => upload::run_upload(&global, upload_args, cancel).await,
        Commands::List => archives::run_list(&global).await,
        Commands::Revert(revert_args) => archives::run_revert(&global, revert_args).await,
        Commands::Apply(stamp_args) => archives::run_apply(&global, stamp_args).await,
        Commands::Delete(stamp_args) => archives::run_delete(&global, stamp_args).await,
        Commands::Clear(clear_args) => archives::run_clear(&global, clear_args).await,
        Commands::Info => info::run_info(&global).await,
        Commands::Gc => info::run_gc(&global).await,
    }
}
