//! Reconciles the remote change feed with the local cache.

mod engine;

use serde::Serialize;

use crate::models::Save;

pub use engine::SyncEngine;

/// Which sync path ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Start-up: serve the cache, or fetch everything when it is empty
    Bootstrap,
    /// Incremental fetch from the stored cursor
    Refresh,
}

/// Where the displayed saves came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Cache,
    Remote,
}

/// Counters for one completed sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Changes received from the remote
    pub fetched: usize,
    /// Saves inserted or replaced
    pub upserted: usize,
    /// Deletion markers applied
    pub deleted: usize,
    /// Cursor stored after the sync
    pub cursor: i64,
}

/// Result of a successful sync: the active saves to display plus counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub kind: SyncKind,
    pub source: SyncSource,
    /// Active saves, newest first
    pub saves: Vec<Save>,
    pub report: SyncReport,
}

/// Messages from the engine to the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Started {
        kind: SyncKind,
    },
    Completed {
        kind: SyncKind,
        source: SyncSource,
        saves: Vec<Save>,
        report: SyncReport,
    },
    Failed {
        kind: SyncKind,
        message: String,
    },
}

impl From<SyncOutcome> for SyncEvent {
    fn from(outcome: SyncOutcome) -> Self {
        Self::Completed {
            kind: outcome.kind,
            source: outcome.source,
            saves: outcome.saves,
            report: outcome.report,
        }
    }
}

/// Answer to a sync request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The request claimed the engine; its result arrives as an event
    Started,
    /// Another sync is in flight; nothing was done
    AlreadySyncing,
    /// No stored user to sync for
    NotAuthenticated,
}
