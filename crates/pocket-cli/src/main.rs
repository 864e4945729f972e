//! pocket - Browse your Pocket saves from the terminal
//!
//! Lists, shows and opens saves from a local cache that is kept in step with
//! the Pocket API.

mod browser;
mod callback;
mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::resolve_config;
use crate::commands::list::run_list;
use crate::commands::open::run_open;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
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

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "pocket=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = resolve_config(cli.db_path)?;
    tracing::debug!("Using {:?}", config);

    match cli.command {
        None => run_list(None, None, false, &config).await?,
        Some(Commands::List {
            limit,
            filter,
            json,
        }) => run_list(limit, filter.as_deref(), json, &config).await?,
        Some(Commands::Sync) => run_sync(&config).await?,
        Some(Commands::Show { id, content, json }) => {
            run_show(&id, content, json, &config).await?;
        }
        Some(Commands::Open { id }) => run_open(&id, &config).await?,
        Some(Commands::Auth { command }) => run_auth(command, &config).await?,
    }

    Ok(())
}
