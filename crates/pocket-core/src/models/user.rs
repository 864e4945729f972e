//! User model

use std::fmt;

use serde::{Deserialize, Serialize};

/// The single locally authenticated account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub access_token: String,
    pub username: String,
    /// Server-issued watermark of the last applied sync (0 = never synced)
    pub last_sync_cursor: i64,
}

impl User {
    /// A freshly authenticated user that has never synced
    pub fn new(access_token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            username: username.into(),
            last_sync_cursor: 0,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("User")
            .field("access_token", &"[REDACTED]")
            .field("username", &self.username)
            .field("last_sync_cursor", &self.last_sync_cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_not_synced() {
        let user = User::new("token", "reader");
        assert_eq!(user.last_sync_cursor, 0);
    }

    #[test]
    fn user_debug_redacts_token() {
        let user = User::new("secret-access-token", "reader");
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("reader"));
    }
}
