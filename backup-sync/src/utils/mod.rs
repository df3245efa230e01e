//! Utility modules for backup-sync.

pub mod errors;
pub mod logger;

pub use errors::{BackupError, Result};
