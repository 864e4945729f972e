//! pocket-core - Core library for pocket-cli
//!
//! This crate contains the save and user models, the local libSQL cache, the
//! Pocket API clients, the sync engine that keeps the cache in step with the
//! remote, and readable-text extraction for saved pages. The `pocket` binary
//! is a thin front end over it.

pub mod article;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Save, SaveId, SaveStatus, User};
pub use services::Store;
