//! Database layer for the local save cache

mod connection;
mod migrations;
mod save_repository;
mod user_repository;

pub use connection::Database;
pub use save_repository::{LibSqlSaveRepository, SaveRepository};
pub use user_repository::{LibSqlUserRepository, UserRepository};
