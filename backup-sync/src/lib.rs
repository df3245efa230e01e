//! backup-sync library
//!
//! Incremental backup of a directory's top-level items to an object store.
//! Each item is fingerprinted, compared with the `<item>.md5` marker in the
//! bucket, and uploaded as `<item>.tar.gz` only when it changed.

pub mod config;
pub mod executor;
pub mod fs;
pub mod store;
pub mod sync;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{Config, RunOptions};
pub use executor::report::{ItemOutcome, ItemReport, RunSummary};
pub use executor::BackupExecutor;
pub use store::{open_store, ObjectStore, StorageClass};
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
