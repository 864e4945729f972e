//! Data models for pocket-cli

mod save;
mod user;

pub use save::{sort_newest_first, Save, SaveId, SaveStatus};
pub use user::User;
