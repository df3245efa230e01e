//! Remote marker naming and lookup.
//!
//! The marker `<item>.md5` holds the hex fingerprint of the last uploaded
//! archive `<item>.tar.gz`. Key names must not change: existing buckets
//! depend on them.

use crate::store::ObjectStore;
use tracing::{debug, warn};

const MARKER_SUFFIX: &str = ".md5";
const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Key of the fingerprint marker for an item.
pub fn marker_key(item_name: &str) -> String {
    format!("{}{}", item_name, MARKER_SUFFIX)
}

/// Key of the archive for an item.
pub fn archive_key(item_name: &str) -> String {
    format!("{}{}", item_name, ARCHIVE_SUFFIX)
}

/// Outcome of fetching a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerLookup {
    /// Marker text, exactly as stored
    Found(String),
    /// No marker at the key
    NotFound,
    /// The fetch failed or the body is not UTF-8
    Unavailable(String),
}

impl MarkerLookup {
    /// Collapse to the lenient view: anything but `Found` is "no marker".
    pub fn into_option(self) -> Option<String> {
        match self {
            MarkerLookup::Found(text) => Some(text),
            MarkerLookup::NotFound | MarkerLookup::Unavailable(_) => None,
        }
    }
}

/// Fetch the marker for `item_name`, keeping failures distinct from absence.
pub async fn lookup_marker(store: &dyn ObjectStore, item_name: &str) -> MarkerLookup {
    let key = marker_key(item_name);

    match store.get(&key).await {
        Ok(Some(body)) => match String::from_utf8(body.to_vec()) {
            Ok(text) => MarkerLookup::Found(text),
            Err(e) => MarkerLookup::Unavailable(format!("marker is not UTF-8: {}", e)),
        },
        Ok(None) => {
            debug!("No marker at {}", key);
            MarkerLookup::NotFound
        }
        Err(e) => MarkerLookup::Unavailable(e.to_string()),
    }
}

/// Fetch the marker for `item_name`.
///
/// Every failure reads as `None`, so a transient error and a first run look
/// the same and both lead to an upload.
pub async fn read_marker(store: &dyn ObjectStore, item_name: &str) -> Option<String> {
    let lookup = lookup_marker(store, item_name).await;
    if let MarkerLookup::Unavailable(reason) = &lookup {
        warn!("Treating {} as missing: {}", marker_key(item_name), reason);
    }
    lookup.into_option()
}
