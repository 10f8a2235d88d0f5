//! Tally CLI - offline-first inventory auditing from the terminal
//!
//! Stands in for the mobile UI: drives the sync engine and inspects the
//! local record store.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{AuditCommands, Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tally_core=info".parse().unwrap())
                .add_directive("tally_cli=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Status { json } => commands::status::run_status(json, &db_path).await?,
        Commands::Sync => commands::sync::run_sync(&db_path).await?,
        Commands::Pending { json } => commands::pending::run_pending(json, &db_path)?,
        Commands::Locations { json } => commands::locations::run_locations(json, &db_path)?,
        Commands::Items { code, json } => commands::items::run_items(&code, json, &db_path)?,
        Commands::Count {
            sku,
            qty,
            tag,
            remarks,
        } => commands::items::run_count(&sku, qty, tag.as_deref(), remarks.as_deref(), &db_path)?,
        Commands::Audit { command } => match command {
            AuditCommands::List { json } => commands::audit::run_list(json, &db_path)?,
            AuditCommands::New { code } => commands::audit::run_new(&code, &db_path)?,
            AuditCommands::Finding {
                report,
                sku,
                qty,
                tag,
                remarks,
            } => commands::audit::run_finding(
                &report,
                &sku,
                qty,
                tag.as_deref(),
                remarks.as_deref(),
                &db_path,
            )?,
        },
        Commands::Wipe { yes } => commands::wipe::run_wipe(yes, &db_path)?,
    }

    Ok(())
}
