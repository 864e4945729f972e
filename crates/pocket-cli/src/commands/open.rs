use pocket_core::config::AppConfig;

use crate::browser::open_in_browser;
use crate::commands::common::{find_save, open_store};
use crate::error::CliError;

pub async fn run_open(id: &str, config: &AppConfig) -> Result<(), CliError> {
    let store = open_store(config).await?;
    let save = find_save(&store, id).await?;

    open_in_browser(&save.url)?;
    println!("Opened {}", save.url);
    Ok(())
}
