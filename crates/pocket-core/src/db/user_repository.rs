//! User repository implementation

use crate::error::{Error, Result};
use crate::models::User;
use libsql::Connection;

/// Trait for the single-row user record (async)
#[allow(async_fn_in_trait)]
pub trait UserRepository {
    /// Load the stored user, if anyone has authenticated yet
    async fn get(&self) -> Result<Option<User>>;

    /// Insert the user, or replace the token/username of the existing one
    ///
    /// The sync cursor is kept on update and starts at 0 on insert.
    async fn save(&self, access_token: &str, username: &str) -> Result<User>;

    /// Record the watermark of the last applied sync
    async fn set_cursor(&self, cursor: i64) -> Result<()>;
}

/// libSQL implementation of `UserRepository`
pub struct LibSqlUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            access_token: row.get(0)?,
            username: row.get(1)?,
            last_sync_cursor: row.get(2)?,
        })
    }
}

impl UserRepository for LibSqlUserRepository<'_> {
    async fn get(&self) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT access_token, username, saves_updated_on FROM user LIMIT 1",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, access_token: &str, username: &str) -> Result<User> {
        if access_token.trim().is_empty() {
            return Err(Error::InvalidInput("access token cannot be empty".into()));
        }

        if let Some(current) = self.get().await? {
            self.conn
                .execute(
                    "UPDATE user SET access_token = ?, username = ?",
                    [access_token, username],
                )
                .await?;
            tracing::debug!("Replaced stored token for {}", username);
            return Ok(User {
                access_token: access_token.to_string(),
                username: username.to_string(),
                last_sync_cursor: current.last_sync_cursor,
            });
        }

        self.conn
            .execute(
                "INSERT INTO user (username, access_token, saves_updated_on) VALUES (?, ?, 0)",
                [username, access_token],
            )
            .await?;
        tracing::debug!("Stored new user {}", username);
        Ok(User::new(access_token, username))
    }

    async fn set_cursor(&self, cursor: i64) -> Result<()> {
        let updated = self
            .conn
            .execute("UPDATE user SET saves_updated_on = ?", [cursor])
            .await?;

        if updated == 0 {
            return Err(Error::NotFound("no stored user to record the sync cursor".into()));
        }
        Ok(())
    }
}
