pub mod auth_cmd;
pub mod common;
pub mod list;
pub mod open;
pub mod show;
pub mod sync;
