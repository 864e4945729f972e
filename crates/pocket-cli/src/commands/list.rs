use pocket_core::config::AppConfig;
use pocket_core::sync::SyncSource;

use crate::commands::common::{
    filter_saves, format_save_lines, lenient_engine, open_store, save_to_list_item, SaveListItem,
};
use crate::error::CliError;

/// Start-up sync (cache first, full fetch on an empty cache), then print.
pub async fn run_list(
    limit: Option<usize>,
    filter: Option<&str>,
    as_json: bool,
    config: &AppConfig,
) -> Result<(), CliError> {
    let store = open_store(config).await?;
    let (engine, _events) = lenient_engine(config, store);

    let outcome = engine.start().await?.ok_or(CliError::NotSignedIn)?;
    let matching = filter_saves(outcome.saves, filter);
    let total = matching.len();
    let saves = &matching[..limit.map_or(total, |limit| limit.min(total))];

    if as_json {
        let json_items = saves
            .iter()
            .map(save_to_list_item)
            .collect::<Vec<SaveListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if saves.is_empty() {
        match filter {
            Some(query) if !query.trim().is_empty() => {
                println!("No saves match '{}'.", query.trim());
            }
            _ => println!("No saves yet."),
        }
        return Ok(());
    }

    for line in format_save_lines(saves) {
        println!("{line}");
    }
    if outcome.source == SyncSource::Remote {
        eprintln!("Fetched {} saves.", outcome.report.upserted);
    }
    if saves.len() < total {
        eprintln!("Showing {} of {total} saves.", saves.len());
    }
    Ok(())
}
