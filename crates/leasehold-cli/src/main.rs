//! Main entry point for the `leasehold` CLI.
//!
//! Loads configuration, sets up logging, and maps command outcomes to exit
//! codes: 0 done, 1 refused by the lock table, 2 error.

use std::process::ExitCode;

use clap::Parser;
use leasehold_cli::cli::Cli;
use leasehold_cli::config::Configuration;
use leasehold_cli::{EXIT_ERROR, EXIT_REFUSED, commands, logging};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let configuration = match Configuration::load(&cli) {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = logging::init_logging(&configuration.log_level()) {
        eprintln!("Warning: failed to initialize logging: {:#}", e);
    }

    match commands::dispatch(&configuration, cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_REFUSED),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
