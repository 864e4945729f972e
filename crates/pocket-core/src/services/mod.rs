//! Shared services used across the engine and the CLI.

mod store;

pub use store::Store;
