//! Writes an item's archive and marker to the object store.
//!
//! The archive always goes first and the marker last. If the process dies
//! or the archive write fails, the old marker still describes the old
//! archive and the next run retries the item.

use crate::store::{ObjectStore, StorageClass};
use crate::sync::fingerprint::Fingerprint;
use crate::sync::marker::{archive_key, marker_key};
use crate::transfer::archive::ArchiveBlob;
use crate::utils::errors::Result;
use bytes::Bytes;
use tracing::{debug, info};

/// What [`upload`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Compressed archive size, if an archive was written
    pub archive_bytes: Option<u64>,
}

/// Upload `archive` (if any) and then the marker for `item_name`.
///
/// The archive is written with `storage_class`; the marker is small and
/// read on every run, so it always uses `STANDARD`. An archive failure
/// returns before the marker is touched.
pub async fn upload(
    store: &dyn ObjectStore,
    item_name: &str,
    archive: Option<&ArchiveBlob>,
    marker: &Fingerprint,
    storage_class: StorageClass,
) -> Result<UploadReceipt> {
    let mut archive_bytes = None;

    if let Some(blob) = archive {
        let key = archive_key(item_name);
        debug!("Uploading {} ({} bytes, {})", key, blob.len(), storage_class);
        store.put(&key, blob.bytes(), storage_class).await?;
        archive_bytes = Some(blob.len() as u64);
    }

    let key = marker_key(item_name);
    store
        .put(&key, Bytes::from(marker.as_str().to_owned()), StorageClass::Standard)
        .await?;
    info!("Marker {} set to {}", key, marker);

    Ok(UploadReceipt { archive_bytes })
}
