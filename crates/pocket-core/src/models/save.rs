//! Save model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Remote-assigned identifier of a save, stable across syncs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveId(String);

impl SaveId {
    /// Wrap a remote item id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SaveId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Save ID cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for SaveId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle status of a save as reported by the remote service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// Unread, shown in the default list
    #[default]
    Active,
    /// Kept locally but hidden from the default list
    Archived,
    /// Removed remotely; never stored
    Deleted,
}

impl SaveStatus {
    /// Integer code used on the wire and in the `save.status` column
    pub const fn code(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Archived => 1,
            Self::Deleted => 2,
        }
    }

    /// Parse the integer code used on the wire and in storage
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::Archived),
            2 => Some(Self::Deleted),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A bookmarked article with remote-sourced metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Save {
    /// Remote identifier (primary key)
    pub id: SaveId,
    /// Resolved or user-given title
    pub title: String,
    /// Article URL, never empty for stored saves
    pub url: String,
    /// Excerpt, may be empty
    pub description: String,
    /// Estimated reading time in minutes (0 = unknown)
    pub time_to_read: i64,
    pub status: SaveStatus,
    pub favorite: bool,
    /// Comma-joined tag names, no ordering guarantee
    pub tags: String,
    /// Unix seconds
    pub added_on: i64,
    /// Unix seconds
    pub updated_on: i64,
}

impl Save {
    /// Create an active save with only the required fields set
    #[must_use]
    pub fn new(id: impl Into<SaveId>, url: impl Into<String>, added_on: i64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            url: url.into(),
            description: String::new(),
            time_to_read: 0,
            status: SaveStatus::Active,
            favorite: false,
            tags: String::new(),
            added_on,
            updated_on: added_on,
        }
    }

    /// Marker for a remote deletion; only the id matters
    #[must_use]
    pub fn deleted(id: impl Into<SaveId>) -> Self {
        Self {
            status: SaveStatus::Deleted,
            ..Self::new(id, String::new(), 0)
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self.status, SaveStatus::Active)
    }

    pub const fn is_deleted(&self) -> bool {
        matches!(self.status, SaveStatus::Deleted)
    }

    /// Title for display, falling back to the URL
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    /// Description for display, falling back to the URL
    #[must_use]
    pub fn display_description(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.url
        } else {
            &self.description
        }
    }

    /// Split the stored tag string into names
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

impl From<String> for SaveId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Sort saves newest first by `added_on`, keeping the existing order for ties
pub fn sort_newest_first(saves: &mut [Save]) {
    saves.sort_by(|left, right| right.added_on.cmp(&left.added_on));
}
