//! Shared store handle used by the sync engine and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlSaveRepository, LibSqlUserRepository, SaveRepository, UserRepository,
};
use crate::models::{Save, SaveId, User};
use crate::{Error, Result};

/// Thread-safe handle over the local cache.
///
/// Clones share one connection; every operation holds the lock for its whole
/// duration, so sync batches never interleave.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl Store {
    /// Open the cache at the given filesystem path.
    ///
    /// A file that is not a database is moved aside and a fresh cache is
    /// created in its place; the remote repopulates it on the next sync.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Cache at {} is unreadable ({}); starting a fresh one",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        tracing::debug!("Opened cache at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database") || message.contains("malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .map_or_else(|| "cache.db".into(), |name| name.to_string_lossy());
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved unreadable cache from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed stale cache sidecar {}", path.display());
            }
        }

        Ok(())
    }

    /// Create missing tables. Existing rows are never touched.
    pub async fn ensure_schema(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.ensure_schema().await
    }

    /// The signed-in user, if any.
    pub async fn get_user(&self) -> Result<Option<User>> {
        let db = self.db.lock().await;
        LibSqlUserRepository::new(db.connection()).get().await
    }

    /// Store a freshly authenticated user, keeping the cursor of an existing one.
    pub async fn save_user(&self, access_token: &str, username: &str) -> Result<User> {
        let db = self.db.lock().await;
        LibSqlUserRepository::new(db.connection())
            .save(access_token, username)
            .await
    }

    /// Active saves, most recently added first.
    pub async fn list_active_saves(&self) -> Result<Vec<Save>> {
        let db = self.db.lock().await;
        LibSqlSaveRepository::new(db.connection()).list_active().await
    }

    /// Active saves from the cache, or `Error::NotFound` when nothing has
    /// ever been stored.
    pub async fn load_cached_saves(&self) -> Result<Vec<Save>> {
        let db = self.db.lock().await;
        let repo = LibSqlSaveRepository::new(db.connection());

        if repo.count().await? == 0 {
            return Err(Error::NotFound("no cached saves".to_string()));
        }
        repo.list_active().await
    }

    /// Fetch a save by id regardless of status.
    pub async fn get_save(&self, id: &SaveId) -> Result<Option<Save>> {
        let db = self.db.lock().await;
        LibSqlSaveRepository::new(db.connection()).get(id).await
    }

    /// Apply a remote change batch and advance the cursor in one transaction.
    pub async fn apply_sync_batch(&self, new_cursor: i64, changes: &[Save]) -> Result<Vec<Save>> {
        let db = self.db.lock().await;
        LibSqlSaveRepository::new(db.connection())
            .apply_batch(new_cursor, changes)
            .await
    }

    /// Number of stored saves, archived included.
    pub async fn count_saves(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlSaveRepository::new(db.connection()).count().await
    }
}
