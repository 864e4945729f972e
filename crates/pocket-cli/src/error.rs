use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pocket_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `pocket auth login` first.")]
    NotSignedIn,
    #[error("Save ID cannot be empty")]
    EmptySaveId,
    #[error("Save not found: {0}")]
    SaveNotFound(String),
    #[error("Could not open browser: {0}")]
    BrowserFailed(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error("A sync is already in progress")]
    SyncInProgress,
}
