//! Wordsync CLI - operator tooling for a vocabulary sync store
//!
//! Reads and maintains the same SQLite store the API server writes to.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::apply::run_apply;
use crate::commands::cleanup::run_cleanup;
use crate::commands::common::resolve_db_path;
use crate::commands::devices::run_devices;
use crate::commands::erase::run_erase;
use crate::commands::export::run_export;
use crate::commands::log::run_log;
use crate::commands::status::run_status;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wordsync=warn".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Status { json } => run_status(json, &db_path)?,
        Commands::Devices { json } => run_devices(json, &db_path)?,
        Commands::Log { limit, json } => run_log(limit, json, &db_path)?,
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &db_path)?;
        }
        Commands::Apply { file, device_id } => {
            run_apply(&file, device_id.as_deref(), &db_path)?;
        }
        Commands::Cleanup => {
            run_cleanup(&db_path)?;
        }
        Commands::Erase { yes } => {
            run_erase(yes, &db_path)?;
        }
    }

    Ok(())
}
