//! Sync engine state shared with the UI.

use std::fmt;

use serde::Serialize;

/// Lifecycle phase of the sync engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No stored user
    #[default]
    Uninitialized,
    /// Waiting for the browser authorization to finish
    Authenticating,
    Idle,
    Syncing,
}

impl SyncPhase {
    /// Status line text for the UI.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "Not signed in",
            Self::Authenticating => "Waiting for authorization",
            Self::Idle => "Ready",
            Self::Syncing => "Syncing",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Snapshot of the engine state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub phase: SyncPhase,
    /// Signed-in account, if any
    pub username: Option<String>,
    /// Message of the most recent failed sync, cleared by the next success
    pub last_error: Option<String>,
}

impl EngineStatus {
    pub const fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    /// Status line text, including the last error when there is one.
    pub fn status_text(&self) -> String {
        match &self.last_error {
            Some(error) => format!("{} (last sync failed: {error})", self.phase),
            None => self.phase.to_string(),
        }
    }
}
