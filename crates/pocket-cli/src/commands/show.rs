use pocket_core::article::ArticleFetcher;
use pocket_core::config::AppConfig;

use crate::commands::common::{find_save, format_save_detail, open_store, save_to_list_item};
use crate::error::CliError;

pub async fn run_show(
    id: &str,
    with_content: bool,
    as_json: bool,
    config: &AppConfig,
) -> Result<(), CliError> {
    let store = open_store(config).await?;
    let save = find_save(&store, id).await?;

    let content = if with_content {
        eprintln!("Fetching {}...", save.url);
        Some(ArticleFetcher::from_config(config)?.fetch_text(&save.url).await?)
    } else {
        None
    };

    if as_json {
        let mut item = save_to_list_item(&save);
        item.content = content;
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        for line in format_save_detail(&save, content.as_deref()) {
            println!("{line}");
        }
    }
    Ok(())
}
