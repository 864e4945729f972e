//! Sync engine: bootstrap and incremental sync over the local store.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::models::{sort_newest_first, Save, User};
use crate::remote::RemoteFetcher;
use crate::services::Store;
use crate::state::{EngineStatus, SyncPhase};
use crate::{Error, Result};

use super::{Dispatch, SyncEvent, SyncKind, SyncOutcome, SyncReport, SyncSource};

enum Claim {
    Granted(User),
    Rejected(Dispatch),
}

/// Single owner of sync state.
///
/// Clones share the same state, so a clone can be moved into a spawned task
/// while the UI keeps another. Only one sync runs at a time; requests that
/// arrive while one is in flight are rejected without touching the remote.
#[derive(Clone)]
pub struct SyncEngine {
    store: Store,
    fetcher: Arc<dyn RemoteFetcher>,
    status: Arc<RwLock<EngineStatus>>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncEngine {
    /// Create an engine and the receiver its events are delivered on.
    pub fn new(
        store: Store,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = Self {
            store,
            fetcher,
            status: Arc::new(RwLock::new(EngineStatus::default())),
            events,
        };
        (engine, receiver)
    }

    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Current state snapshot.
    pub async fn status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }

    /// Start-up sync: the cached saves, or a full fetch when the cache is empty.
    ///
    /// Returns `None` without a stored user; the engine stays uninitialized.
    pub async fn start(&self) -> Result<Option<SyncOutcome>> {
        match self.begin(SyncKind::Bootstrap).await? {
            Claim::Granted(user) => {
                let result = self.bootstrap(&user).await;
                self.complete(SyncKind::Bootstrap, result).await.map(Some)
            }
            Claim::Rejected(Dispatch::NotAuthenticated) => Ok(None),
            Claim::Rejected(dispatch) => Err(rejection_error(dispatch)),
        }
    }

    /// Incremental sync from the stored cursor.
    pub async fn refresh(&self) -> Result<SyncOutcome> {
        match self.begin(SyncKind::Refresh).await? {
            Claim::Granted(user) => {
                let result = self.incremental(&user).await;
                self.complete(SyncKind::Refresh, result).await
            }
            Claim::Rejected(dispatch) => Err(rejection_error(dispatch)),
        }
    }

    /// Like [`Self::start`], running the sync on the runtime.
    pub async fn spawn_start(&self) -> Result<Dispatch> {
        self.spawn(SyncKind::Bootstrap).await
    }

    /// Like [`Self::refresh`], running the sync on the runtime.
    pub async fn spawn_refresh(&self) -> Result<Dispatch> {
        self.spawn(SyncKind::Refresh).await
    }

    /// Mark the browser authorization as in progress.
    pub async fn begin_authentication(&self) -> Result<()> {
        let mut status = self.status.write().await;
        if status.phase == SyncPhase::Syncing {
            return Err(rejection_error(Dispatch::AlreadySyncing));
        }
        status.phase = SyncPhase::Authenticating;
        status.last_error = None;
        debug!("Waiting for authorization");
        Ok(())
    }

    /// Store the new credentials and run the start-up sync for them.
    pub async fn authenticated(&self, access_token: &str, username: &str) -> Result<SyncOutcome> {
        self.persist_user(access_token, username).await?;
        match self.start().await? {
            Some(outcome) => Ok(outcome),
            None => Err(Error::Auth("stored user disappeared".to_string())),
        }
    }

    /// Like [`Self::authenticated`], running the sync on the runtime.
    pub async fn spawn_authenticated(&self, access_token: &str, username: &str) -> Result<Dispatch> {
        self.persist_user(access_token, username).await?;
        self.spawn_start().await
    }

    /// The authorization flow failed or was abandoned.
    pub async fn authentication_failed(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("Authentication failed: {}", message);

        let mut status = self.status.write().await;
        status.phase = if status.is_authenticated() {
            SyncPhase::Idle
        } else {
            SyncPhase::Uninitialized
        };
        status.last_error = Some(message);
    }

    async fn persist_user(&self, access_token: &str, username: &str) -> Result<()> {
        match self.store.save_user(access_token, username).await {
            Ok(user) => {
                info!("Signed in as {}", user.username);
                Ok(())
            }
            Err(error) => {
                self.authentication_failed(error.to_string()).await;
                Err(error)
            }
        }
    }

    async fn spawn(&self, kind: SyncKind) -> Result<Dispatch> {
        let user = match self.begin(kind).await? {
            Claim::Granted(user) => user,
            Claim::Rejected(dispatch) => return Ok(dispatch),
        };

        let engine = self.clone();
        tokio::spawn(async move {
            let result = match kind {
                SyncKind::Bootstrap => engine.bootstrap(&user).await,
                SyncKind::Refresh => engine.incremental(&user).await,
            };
            // Errors are reported through the event channel
            let _ = engine.complete(kind, result).await;
        });

        Ok(Dispatch::Started)
    }

    /// Claim the engine for one sync: the check-and-set runs under the lock.
    ///
    /// The user is read only after the claim, so a request queued behind a
    /// finishing sync starts from the cursor that sync committed.
    async fn begin(&self, kind: SyncKind) -> Result<Claim> {
        let mut status = self.status.write().await;
        if status.phase == SyncPhase::Syncing {
            debug!("Rejected {:?} sync: another sync is in flight", kind);
            return Ok(Claim::Rejected(Dispatch::AlreadySyncing));
        }

        let Some(user) = self.store.get_user().await? else {
            if status.phase != SyncPhase::Authenticating {
                status.phase = SyncPhase::Uninitialized;
            }
            status.username = None;
            return Ok(Claim::Rejected(Dispatch::NotAuthenticated));
        };

        status.phase = SyncPhase::Syncing;
        status.username = Some(user.username.clone());
        let _ = self.events.send(SyncEvent::Started { kind });
        drop(status);

        debug!("Starting {:?} sync from cursor {}", kind, user.last_sync_cursor);
        Ok(Claim::Granted(user))
    }

    async fn bootstrap(&self, user: &User) -> Result<SyncOutcome> {
        match self.store.load_cached_saves().await {
            Ok(saves) => {
                debug!("Serving {} cached saves", saves.len());
                Ok(SyncOutcome {
                    kind: SyncKind::Bootstrap,
                    source: SyncSource::Cache,
                    saves,
                    report: SyncReport {
                        cursor: user.last_sync_cursor,
                        ..SyncReport::default()
                    },
                })
            }
            Err(error) if error.is_not_found() => {
                debug!("Cache is empty, fetching everything");
                let change_set = self.fetcher.fetch_changes(&user.access_token, 0).await?;
                let deleted = count_deleted(&change_set.changes);
                let applied = self
                    .store
                    .apply_sync_batch(change_set.cursor, &change_set.changes)
                    .await?;

                let report = SyncReport {
                    fetched: change_set.changes.len(),
                    upserted: applied.len(),
                    deleted,
                    cursor: change_set.cursor,
                };
                let mut saves: Vec<Save> = applied.into_iter().filter(Save::is_active).collect();
                sort_newest_first(&mut saves);

                Ok(SyncOutcome {
                    kind: SyncKind::Bootstrap,
                    source: SyncSource::Remote,
                    saves,
                    report,
                })
            }
            Err(error) => Err(error),
        }
    }

    async fn incremental(&self, user: &User) -> Result<SyncOutcome> {
        let change_set = self
            .fetcher
            .fetch_changes(&user.access_token, user.last_sync_cursor)
            .await?;
        let deleted = count_deleted(&change_set.changes);
        let applied = self
            .store
            .apply_sync_batch(change_set.cursor, &change_set.changes)
            .await?;
        let saves = self.store.list_active_saves().await?;

        Ok(SyncOutcome {
            kind: SyncKind::Refresh,
            source: SyncSource::Remote,
            saves,
            report: SyncReport {
                fetched: change_set.changes.len(),
                upserted: applied.len(),
                deleted,
                cursor: change_set.cursor,
            },
        })
    }

    /// Release the engine and report the result.
    async fn complete(&self, kind: SyncKind, result: Result<SyncOutcome>) -> Result<SyncOutcome> {
        let mut status = self.status.write().await;
        status.phase = SyncPhase::Idle;

        match &result {
            Ok(outcome) => {
                info!(
                    "{:?} sync done from {:?}: {} fetched, {} upserted, {} deleted, cursor {}",
                    kind,
                    outcome.source,
                    outcome.report.fetched,
                    outcome.report.upserted,
                    outcome.report.deleted,
                    outcome.report.cursor
                );
                status.last_error = None;
                let _ = self.events.send(SyncEvent::from(outcome.clone()));
            }
            Err(error) => {
                warn!("{:?} sync failed: {}", kind, error);
                let message = error.to_string();
                status.last_error = Some(message.clone());
                let _ = self.events.send(SyncEvent::Failed { kind, message });
            }
        }

        result
    }
}

fn count_deleted(changes: &[Save]) -> usize {
    changes.iter().filter(|save| save.is_deleted()).count()
}

fn rejection_error(dispatch: Dispatch) -> Error {
    match dispatch {
        Dispatch::AlreadySyncing => {
            Error::InvalidInput("a sync is already in progress".to_string())
        }
        Dispatch::NotAuthenticated | Dispatch::Started => {
            Error::Auth("not signed in".to_string())
        }
    }
}
