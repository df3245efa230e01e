//! Object store abstraction.
//!
//! The sync core only needs a bucket-scoped key/value blob store with
//! `get` and `put`. Backends:
//! - [`S3Store`]: AWS S3 through the AWS SDK, with profile credentials
//! - [`HttpStore`]: path-style HTTP behind an authenticating gateway
//! - [`LocalStore`]: a local directory standing in for a bucket
//! - [`MemoryStore`]: in-process map, used by tests

pub mod http;
pub mod local;
pub mod memory;
pub mod s3;
#[cfg(test)]
pub(crate) mod stub;

use crate::config::{StoreConfig, StoreKind};
use crate::utils::errors::{BackupError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use http::HttpStore;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Bucket URL scheme selecting [`LocalStore`].
pub const LOCAL_SCHEME: &str = "file://";

/// Storage tier requested for an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    Standard,
    ReducedRedundancy,
    StandardIa,
    OnezoneIa,
    IntelligentTiering,
    Glacier,
    GlacierIr,
    DeepArchive,
    Outposts,
    ExpressOnezone,
}

impl StorageClass {
    pub const ALL: [StorageClass; 10] = [
        StorageClass::Standard,
        StorageClass::ReducedRedundancy,
        StorageClass::StandardIa,
        StorageClass::OnezoneIa,
        StorageClass::IntelligentTiering,
        StorageClass::Glacier,
        StorageClass::GlacierIr,
        StorageClass::DeepArchive,
        StorageClass::Outposts,
        StorageClass::ExpressOnezone,
    ];

    /// Wire name, as sent in `x-amz-storage-class`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "STANDARD",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::Glacier => "GLACIER",
            StorageClass::GlacierIr => "GLACIER_IR",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
            StorageClass::Outposts => "OUTPOSTS",
            StorageClass::ExpressOnezone => "EXPRESS_ONEZONE",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageClass {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        StorageClass::ALL
            .into_iter()
            .find(|class| class.as_str() == wanted)
            .ok_or_else(|| BackupError::InvalidStorageClass(s.to_string()))
    }
}

/// Bucket-scoped blob store.
///
/// Implementations must be safe to share across item pipelines; the run
/// holds a single `Arc<dyn ObjectStore>` for its whole lifetime.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable location, e.g. `s3://bucket` or `file:///backups`.
    fn location(&self) -> String;

    /// Fetch an object. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Create or overwrite an object.
    async fn put(&self, key: &str, body: Bytes, storage_class: StorageClass) -> Result<()>;
}

/// Reject keys that could escape the bucket namespace.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(BackupError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Open the store described by `config`.
///
/// A bucket of the form `file:///path` selects the local backend. Other
/// buckets use the backend named by `store.kind`; the HTTP backend needs an
/// endpoint.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    let bucket = config.bucket.trim();
    if bucket.is_empty() {
        return Err(BackupError::Config("bucket is required".to_string()));
    }

    if let Some(path) = bucket.strip_prefix(LOCAL_SCHEME) {
        return Ok(Arc::new(LocalStore::new(path)));
    }

    match config.kind {
        StoreKind::S3 => Ok(Arc::new(S3Store::connect(bucket, config).await?)),
        StoreKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                BackupError::Config(format!(
                    "no endpoint configured for HTTP bucket '{}' (set store.endpoint)",
                    bucket
                ))
            })?;

            let store = HttpStore::new(
                endpoint,
                bucket,
                config.token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(store))
        }
    }
}
