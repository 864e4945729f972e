use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pocket")]
#[command(about = "Browse your Pocket saves from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List saves, newest first (the default command)
    #[command(alias = "ls")]
    List {
        /// Number of saves to show (all when omitted)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only saves whose title contains this text (case-insensitive)
        #[arg(short, long, value_name = "TEXT")]
        filter: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch changes made since the last sync
    #[command(alias = "refresh")]
    Sync,
    /// Show the details of a save, archived ones included
    Show {
        /// Save ID
        id: String,
        /// Download the page and show its readable text instead of the excerpt
        #[arg(short, long)]
        content: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open a save in the system browser
    Open {
        /// Save ID
        id: String,
    },
    /// Sign in to Pocket
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Authorize this client in the browser and cache your saves
    Login,
    /// Show the signed-in account and cache state
    Status,
}
