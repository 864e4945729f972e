//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for a local libSQL cache file
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open the cache at the given path, creating it (and its parent
    /// directory) if it doesn't exist
    ///
    /// Ensures the schema automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| {
                Error::Connection(format!(
                    "failed to create cache directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str)
            .build()
            .await
            .map_err(|error| Error::Connection(format!("{}: {error}", path.display())))?;
        let conn = db
            .connect()
            .map_err(|error| Error::Connection(format!("{}: {error}", path.display())))?;

        let database = Self { _db: db, conn };
        database
            .initialize()
            .await
            .map_err(|error| Error::Connection(format!("{}: {error}", path.display())))?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|error| Error::Connection(error.to_string()))?;
        let conn = db
            .connect()
            .map_err(|error| Error::Connection(error.to_string()))?;

        let database = Self { _db: db, conn };
        database.initialize().await?;
        Ok(database)
    }

    async fn initialize(&self) -> Result<()> {
        self.configure().await?;
        self.ensure_schema().await
    }

    /// Configure `SQLite` for a single-writer local cache
    async fn configure(&self) -> Result<()> {
        // WAL is not available for in-memory databases
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA busy_timeout = 5000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Create the user and save tables if they are missing
    ///
    /// Safe to call repeatedly; existing rows are never touched.
    pub async fn ensure_schema(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("cache").join("cache.db");

        let _db = Database::open(&db_path).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reopen_keeps_existing_rows() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("cache.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO user (username, access_token) VALUES (?, ?)",
                    ["reader", "token"],
                )
                .await
                .unwrap();
        }

        let db = Database::open(&db_path).await.unwrap();
        db.ensure_schema().await.unwrap();
        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM user", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_fails_with_connection_error_when_path_is_a_directory() {
        let tmp = tempdir().unwrap();

        let result = Database::open(tmp.path()).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
