//! Custom error types for backup-sync.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid storage class: {0}")]
    InvalidStorageClass(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item name is not valid UTF-8: {}", .0.display())]
    InvalidItemName(PathBuf),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("S3 request for {key} failed: {message}")]
    S3 { key: String, message: String },

    #[error("Remote store returned {status} for {key}")]
    Remote { key: String, status: u16 },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Marker fetch failed for {key}: {reason}")]
    MarkerUnavailable { key: String, reason: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<config::ConfigError> for BackupError {
    fn from(err: config::ConfigError) -> Self {
        BackupError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
