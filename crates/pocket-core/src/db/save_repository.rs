//! Save repository implementation

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite uses i64 for counts

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{Save, SaveId, SaveStatus};
use libsql::{params, Connection};

use super::user_repository::{LibSqlUserRepository, UserRepository};

const SAVE_COLUMNS: &str =
    "id, title, url, description, time_to_read, status, favorite, tags, added_on, updated_on";

/// Trait for save storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SaveRepository {
    /// Get a save by ID, whatever its status
    async fn get(&self, id: &SaveId) -> Result<Option<Save>>;

    /// List active saves, most recently added first
    async fn list_active(&self) -> Result<Vec<Save>>;

    /// Count every stored save, archived ones included
    async fn count(&self) -> Result<usize>;

    /// Apply one remote change batch and advance the sync cursor atomically
    ///
    /// Returns the saves that were upserted, without deletions.
    async fn apply_batch(&self, cursor: i64, changes: &[Save]) -> Result<Vec<Save>>;
}

/// libSQL implementation of `SaveRepository`
pub struct LibSqlSaveRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSaveRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a save from a database row
    fn parse_save(row: &libsql::Row) -> Result<Save> {
        let id: String = row.get(0)?;
        let status_code: i64 = row.get(5)?;
        let status = SaveStatus::from_code(status_code).ok_or_else(|| {
            Error::InvalidInput(format!("save {id} has unknown status {status_code}"))
        })?;

        Ok(Save {
            id: SaveId::new(id),
            title: row.get(1)?,
            url: row.get(2)?,
            description: row.get(3)?,
            time_to_read: row.get(4)?,
            status,
            favorite: row.get::<i64>(6)? != 0,
            tags: row.get(7)?,
            added_on: row.get(8)?,
            updated_on: row.get(9)?,
        })
    }

    async fn upsert(&self, save: &Save) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO save (id, title, url, description, time_to_read, status, favorite, tags, added_on, updated_on)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     url = excluded.url,
                     description = excluded.description,
                     time_to_read = excluded.time_to_read,
                     status = excluded.status,
                     favorite = excluded.favorite,
                     tags = excluded.tags,
                     added_on = excluded.added_on,
                     updated_on = excluded.updated_on",
                params![
                    save.id.as_str(),
                    save.title.as_str(),
                    save.url.as_str(),
                    save.description.as_str(),
                    save.time_to_read,
                    save.status.code(),
                    i64::from(save.favorite),
                    save.tags.as_str(),
                    save.added_on,
                    save.updated_on
                ],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &SaveId) -> Result<()> {
        self.conn
            .execute("DELETE FROM save WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }

    /// Run every write of the batch; the caller owns the transaction
    async fn write_batch(&self, cursor: i64, changes: &[Save]) -> Result<Vec<Save>> {
        let mut applied: Vec<Save> = Vec::with_capacity(changes.len());
        let mut positions: HashMap<SaveId, usize> = HashMap::new();

        for change in changes {
            if change.is_deleted() {
                self.remove(&change.id).await?;
                if let Some(position) = positions.remove(&change.id) {
                    applied.remove(position);
                    for index in positions.values_mut() {
                        if *index > position {
                            *index -= 1;
                        }
                    }
                }
                continue;
            }

            self.upsert(change).await?;
            if let Some(&position) = positions.get(&change.id) {
                applied[position] = change.clone();
            } else {
                positions.insert(change.id.clone(), applied.len());
                applied.push(change.clone());
            }
        }

        LibSqlUserRepository::new(self.conn).set_cursor(cursor).await?;
        Ok(applied)
    }
}

impl SaveRepository for LibSqlSaveRepository<'_> {
    async fn get(&self, id: &SaveId) -> Result<Option<Save>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SAVE_COLUMNS} FROM save WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_save(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<Save>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SAVE_COLUMNS}
                     FROM save
                     WHERE status = ?
                     ORDER BY added_on DESC, rowid ASC"
                ),
                [SaveStatus::Active.code()],
            )
            .await?;

        let mut saves = Vec::new();
        while let Some(row) = rows.next().await? {
            saves.push(Self::parse_save(&row)?);
        }

        Ok(saves)
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM save", ()).await?;

        let count: i64 = if let Some(row) = rows.next().await? {
            row.get(0)?
        } else {
            0
        };

        Ok(count.max(0) as usize)
    }

    async fn apply_batch(&self, cursor: i64, changes: &[Save]) -> Result<Vec<Save>> {
        self.conn
            .execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|error| Error::Transaction(error.to_string()))?;

        match self.write_batch(cursor, changes).await {
            Ok(applied) => {
                if let Err(error) = self.conn.execute("COMMIT", ()).await {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(Error::Transaction(error.to_string()));
                }
                tracing::debug!(
                    "Applied {} changes ({} upserted), cursor now {}",
                    changes.len(),
                    applied.len(),
                    cursor
                );
                Ok(applied)
            }
            Err(error) => {
                self.conn.execute("ROLLBACK", ()).await.ok();
                tracing::warn!("Rolled back sync batch of {} changes: {}", changes.len(), error);
                Err(Error::Transaction(error.to_string()))
            }
        }
    }
}
