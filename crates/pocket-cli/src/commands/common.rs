use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pocket_core::config::AppConfig;
use pocket_core::remote::{ChangeSet, PocketClient, RemoteFetcher};
use pocket_core::sync::{SyncEngine, SyncEvent};
use pocket_core::util::{collapse_whitespace, non_blank};
use pocket_core::{Save, SaveId, Store};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SaveListItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub status: String,
    pub favorite: bool,
    pub time_to_read: i64,
    pub tags: Vec<String>,
    pub added_on: i64,
    pub updated_on: i64,
    pub relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Stands in for the HTTP client when no consumer key is configured, so that
/// a warm cache can still be listed.
struct UnconfiguredFetcher {
    reason: String,
}

#[async_trait]
impl RemoteFetcher for UnconfiguredFetcher {
    async fn fetch_changes(&self, _access_token: &str, _since: i64) -> pocket_core::Result<ChangeSet> {
        Err(pocket_core::Error::Config(self.reason.clone()))
    }
}

pub fn resolve_config(cli_db_path: Option<PathBuf>) -> Result<AppConfig, CliError> {
    let config = AppConfig::from_env()?;
    Ok(match cli_db_path {
        Some(path) => config.with_db_path(path),
        None => config,
    })
}

pub async fn open_store(config: &AppConfig) -> Result<Store, CliError> {
    Ok(Store::open_path(config.db_path.clone()).await?)
}

/// Engine backed by the Pocket API; fails up front without a consumer key.
pub fn remote_engine(
    config: &AppConfig,
    store: Store,
) -> Result<(SyncEngine, mpsc::UnboundedReceiver<SyncEvent>), CliError> {
    let client = PocketClient::from_config(config)?;
    Ok(SyncEngine::new(store, Arc::new(client)))
}

/// Engine that only reports a missing consumer key once it has to reach the remote.
pub fn lenient_engine(
    config: &AppConfig,
    store: Store,
) -> (SyncEngine, mpsc::UnboundedReceiver<SyncEvent>) {
    let fetcher: Arc<dyn RemoteFetcher> = match PocketClient::from_config(config) {
        Ok(client) => Arc::new(client),
        Err(error) => Arc::new(UnconfiguredFetcher {
            reason: error.to_string(),
        }),
    };
    SyncEngine::new(store, fetcher)
}

pub fn normalize_save_id(id: &str) -> Result<SaveId, CliError> {
    id.parse::<SaveId>().map_err(|_| CliError::EmptySaveId)
}

pub async fn find_save(store: &Store, id: &str) -> Result<Save, CliError> {
    let save_id = normalize_save_id(id)?;
    store
        .get_save(&save_id)
        .await?
        .ok_or_else(|| CliError::SaveNotFound(save_id.to_string()))
}

pub fn format_save_lines(saves: &[Save]) -> Vec<String> {
    let now = Utc::now().timestamp();
    saves
        .iter()
        .map(|save| {
            let marker = if save.favorite { "*" } else { " " };
            let title = truncate_text(save.display_title(), 50);
            let relative_time = format_relative_time(save.added_on, now);
            let tags = render_tags(save);

            if tags.is_empty() {
                format!("{:<12} {marker} {title:<50}  {relative_time}", save.id.as_str())
            } else {
                format!(
                    "{:<12} {marker} {title:<50}  {relative_time:<10}  {tags}",
                    save.id.as_str()
                )
            }
        })
        .collect()
}

/// Detail view; `body` (downloaded article text) replaces the excerpt when given.
pub fn format_save_detail(save: &Save, body: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        save.display_title().to_string(),
        save.url.clone(),
        String::new(),
        format!("ID:           {}", save.id),
        format!("Status:       {}", save.status),
        format!("Added:        {}", format_timestamp(save.added_on)),
        format!("Updated:      {}", format_timestamp(save.updated_on)),
        format!("Reading time: {}", format_reading_time(save.time_to_read)),
    ];
    if save.favorite {
        lines.push("Favorite:     yes".to_string());
    }
    let tags = render_tags(save);
    if !tags.is_empty() {
        lines.push(format!("Tags:         {tags}"));
    }
    lines.push(String::new());
    lines.push(body.unwrap_or_else(|| save.display_description()).to_string());
    lines
}

pub fn save_to_list_item(save: &Save) -> SaveListItem {
    let now = Utc::now().timestamp();
    let mut tags: Vec<String> = save.tag_list().into_iter().map(str::to_string).collect();
    tags.sort();

    SaveListItem {
        id: save.id.to_string(),
        title: save.display_title().to_string(),
        url: save.url.clone(),
        description: save.description.clone(),
        status: save.status.label().to_string(),
        favorite: save.favorite,
        time_to_read: save.time_to_read,
        tags,
        added_on: save.added_on,
        updated_on: save.updated_on,
        relative_time: format_relative_time(save.added_on, now),
        content: None,
    }
}

/// Keep saves whose title contains `query`, ignoring case. A blank query keeps all.
pub fn filter_saves(saves: Vec<Save>, query: Option<&str>) -> Vec<Save> {
    let Some(needle) = query.and_then(non_blank).map(str::to_lowercase) else {
        return saves;
    };
    saves
        .into_iter()
        .filter(|save| save.display_title().to_lowercase().contains(&needle))
        .collect()
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace([text]);

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn render_tags(save: &Save) -> String {
    let mut tags = save.tag_list();
    tags.sort_unstable();
    tags.into_iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_reading_time(minutes: i64) -> String {
    if minutes <= 0 {
        "unknown".to_string()
    } else {
        format!("{minutes} min")
    }
}

pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(timestamp, 0).map_or_else(
        || timestamp.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp: i64, now: i64) -> String {
    let diff = now.saturating_sub(timestamp);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
