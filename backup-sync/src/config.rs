//! Configuration management for backup-sync.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BACKUP_SYNC__*` environment variables (`__` separates sections, e.g.
//! `BACKUP_SYNC__STORE__TOKEN`). Command-line flags are applied on top by
//! the binary.

use crate::fs::walker::WalkOptions;
use crate::store::StorageClass;
use crate::sync::policy::RunMode;
use crate::transfer::archive::DEFAULT_COMPRESSION_LEVEL;
use crate::utils::errors::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BACKUP_SYNC";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub scan: ScanConfig,
    pub archive: ArchiveConfig,
    pub log: LogConfig,
    pub performance: PerformanceConfig,
}

/// Remote backend used for a bucket that is not a `file://` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// AWS S3 (or an S3-compatible service) through the AWS SDK
    #[default]
    S3,
    /// Plain path-style HTTP behind a gateway that authenticates a bearer token
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bucket name, or `file:///path` for a local directory
    pub bucket: String,

    /// Remote backend
    pub kind: StoreKind,

    /// Custom endpoint URL (optional for S3, required for HTTP)
    pub endpoint: Option<String>,

    /// AWS profile from the shared config and credentials files
    pub profile: Option<String>,

    /// AWS region, overriding the profile and environment
    pub region: Option<String>,

    /// Bearer token sent with every HTTP request
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Hash file contents as well as paths
    pub checksum_content: bool,

    /// Report what would be uploaded without writing anything
    pub dry_run: bool,

    /// Upload only the marker for changed items
    pub marker_only: bool,

    /// Storage class for archives
    pub storage_class: String,

    /// Fail an item when its marker cannot be read, instead of re-uploading
    pub strict_remote_reads: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Descend into symlinked directories
    pub follow_links: bool,

    /// File or directory names to leave out of fingerprints and archives
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// gzip level (0-9)
    pub compression_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Items processed at the same time
    pub max_concurrent_items: usize,
}

// Default values
fn default_timeout_secs() -> u64 {
    300
}

fn default_storage_class() -> String {
    StorageClass::Standard.as_str().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrent_items() -> usize {
    1
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            kind: StoreKind::default(),
            endpoint: None,
            profile: None,
            region: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            checksum_content: false,
            dry_run: false,
            marker_only: false,
            storage_class: default_storage_class(),
            strict_remote_reads: false,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

impl Config {
    /// Load defaults, an optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scan.exclude")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check the settings and derive the options for a run.
    ///
    /// Every configuration error surfaces here, before any item is touched.
    pub fn run_options(&self) -> Result<RunOptions> {
        let storage_class = self.sync.storage_class.parse::<StorageClass>()?;

        if self.archive.compression_level > 9 {
            return Err(BackupError::Config(format!(
                "archive.compression_level must be 0-9, got {}",
                self.archive.compression_level
            )));
        }

        if self.performance.max_concurrent_items == 0 {
            return Err(BackupError::Config(
                "performance.max_concurrent_items must be at least 1".to_string(),
            ));
        }

        Ok(RunOptions {
            include_content: self.sync.checksum_content,
            mode: RunMode {
                dry_run: self.sync.dry_run,
                marker_only: self.sync.marker_only,
            },
            storage_class,
            strict_remote_reads: self.sync.strict_remote_reads,
            compression_level: self.archive.compression_level,
            walk: WalkOptions {
                follow_links: self.scan.follow_links,
                exclude_patterns: self.scan.exclude.clone(),
            },
            max_concurrent_items: self.performance.max_concurrent_items,
        })
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub include_content: bool,
    pub mode: RunMode,
    pub storage_class: StorageClass,
    pub strict_remote_reads: bool,
    pub compression_level: u32,
    pub walk: WalkOptions,
    pub max_concurrent_items: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_content: false,
            mode: RunMode::default(),
            storage_class: StorageClass::Standard,
            strict_remote_reads: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            walk: WalkOptions::default(),
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}
