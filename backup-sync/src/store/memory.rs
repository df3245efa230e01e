//! In-memory object store for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{validate_key, ObjectStore, StorageClass};
use crate::utils::errors::Result;

/// A stored object and the class it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub storage_class: StorageClass,
}

/// In-memory object store.
///
/// Cloning shares the underlying map, so a test can keep a handle for
/// inspection while the run owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an object together with its storage class.
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().ok()?.get(key).cloned()
    }

    /// Sorted list of keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy of the full bucket contents.
    pub fn snapshot(&self) -> BTreeMap<String, StoredObject> {
        self.objects
            .read()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }

    /// Seed an object directly, bypassing key validation.
    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(
                key.to_string(),
                StoredObject {
                    body: body.into(),
                    storage_class: StorageClass::Standard,
                },
            );
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn location(&self) -> String {
        "memory://".to_string()
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        validate_key(key)?;
        Ok(self.object(key).map(|object| object.body))
    }

    async fn put(&self, key: &str, body: Bytes, storage_class: StorageClass) -> Result<()> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "memory store poisoned"))?;
        objects.insert(key.to_string(), StoredObject { body, storage_class });
        Ok(())
    }
}
