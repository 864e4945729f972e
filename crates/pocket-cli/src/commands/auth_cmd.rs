use std::time::Duration;

use pocket_core::auth::{AccessGrant, PocketAuthClient};
use pocket_core::config::AppConfig;

use crate::browser::open_in_browser;
use crate::callback::CallbackListener;
use crate::cli::AuthCommands;
use crate::commands::common::{format_timestamp, open_store, remote_engine};
use crate::error::CliError;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

pub async fn run_auth(command: AuthCommands, config: &AppConfig) -> Result<(), CliError> {
    match command {
        AuthCommands::Login => run_login(config).await,
        AuthCommands::Status => run_status(config).await,
    }
}

async fn run_login(config: &AppConfig) -> Result<(), CliError> {
    let auth = PocketAuthClient::from_config(config)?;
    let store = open_store(config).await?;
    let (engine, _events) = remote_engine(config, store)?;

    engine.begin_authentication().await?;
    let grant = match authorize_in_browser(&auth, config).await {
        Ok(grant) => grant,
        Err(error) => {
            engine.authentication_failed(error.to_string()).await;
            tracing::debug!("Engine status: {}", engine.status().await.status_text());
            return Err(error);
        }
    };

    let outcome = engine
        .authenticated(&grant.access_token, &grant.username)
        .await?;
    println!(
        "Signed in as {}. {} saves cached.",
        grant.username,
        outcome.saves.len()
    );
    Ok(())
}

async fn authorize_in_browser(
    auth: &PocketAuthClient,
    config: &AppConfig,
) -> Result<AccessGrant, CliError> {
    // Listen before the browser can redirect
    let listener = CallbackListener::bind(config.callback_port).await?;
    let redirect_uri = listener.redirect_uri()?;

    let request = auth.request_token(&redirect_uri).await?;
    let url = auth.authorization_url(&request.code, &redirect_uri);

    println!("Authorize pocket-cli in your browser:\n  {url}");
    if let Err(error) = open_in_browser(&url) {
        eprintln!("{error}. Open the URL above manually.");
    }

    listener.wait_for_callback(LOGIN_TIMEOUT).await?;
    Ok(auth.exchange_token(&request).await?)
}

async fn run_status(config: &AppConfig) -> Result<(), CliError> {
    let store = open_store(config).await?;
    let Some(user) = store.get_user().await? else {
        println!("Not signed in.");
        return Ok(());
    };

    println!("Signed in as {}", user.username);
    println!("Last sync:    {}", format_timestamp(user.last_sync_cursor));
    println!("Cached saves: {}", store.count_saves().await?);
    println!("Cache:        {}", config.db_path.display());
    Ok(())
}
