use pocket_core::config::AppConfig;
use pocket_core::sync::{Dispatch, SyncEvent, SyncReport};

use crate::commands::common::{open_store, remote_engine};
use crate::error::CliError;

pub async fn run_sync(config: &AppConfig) -> Result<(), CliError> {
    let store = open_store(config).await?;
    let (engine, mut events) = remote_engine(config, store)?;

    match engine.spawn_refresh().await? {
        Dispatch::Started => {}
        Dispatch::NotAuthenticated => return Err(CliError::NotSignedIn),
        Dispatch::AlreadySyncing => return Err(CliError::SyncInProgress),
    }

    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Started { .. } => eprintln!("Syncing..."),
            SyncEvent::Completed { saves, report, .. } => {
                println!("{}", format_sync_summary(&report, saves.len()));
                return Ok(());
            }
            SyncEvent::Failed { message, .. } => {
                tracing::debug!("Engine status: {}", engine.status().await.status_text());
                return Err(CliError::SyncFailed(message));
            }
        }
    }

    Err(CliError::SyncFailed("sync ended without a result".to_string()))
}

pub fn format_sync_summary(report: &SyncReport, active: usize) -> String {
    if report.fetched == 0 {
        return format!("Already up to date ({active} saves).");
    }
    format!(
        "Sync completed: {} updated, {} removed ({active} saves).",
        report.upserted, report.deleted
    )
}
