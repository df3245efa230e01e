//! Local directory object store.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{validate_key, ObjectStore, StorageClass, LOCAL_SCHEME};
use crate::utils::errors::Result;

/// Object store backed by a local directory.
///
/// Each key is a file directly under the root. Writes go to a temporary
/// sibling first and are renamed into place, so a reader never sees a
/// half-written object. Storage classes have no meaning here and are
/// ignored.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a local store rooted at `root`.
    ///
    /// Nothing is touched on disk until the first `put`, which creates the
    /// directory if needed. A missing directory reads as an empty bucket.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn location(&self) -> String {
        format!("{}{}", LOCAL_SCHEME, self.root.display())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        validate_key(key)?;

        match fs::read(self.object_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, body: Bytes, storage_class: StorageClass) -> Result<()> {
        validate_key(key)?;

        fs::create_dir_all(&self.root).await?;

        let path = self.object_path(key);
        let partial = self.root.join(format!(".{}.partial", key));

        fs::write(&partial, &body).await?;
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        tracing::debug!(
            "Stored {} ({} bytes, class {} ignored)",
            path.display(),
            body.len(),
            storage_class
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        store
            .put("photos.md5", Bytes::from_static(b"digest"), StorageClass::Standard)
            .await
            .unwrap();

        assert_eq!(store.get("photos.md5").await.unwrap().unwrap(), "digest");
        assert_eq!(
            std::fs::read(temp_dir.path().join("photos.md5")).unwrap(),
            b"digest"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        assert_eq!(store.get("nothing.md5").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_creates_root_on_first_put_and_leaves_no_partials() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested/bucket");
        let store = LocalStore::new(&root);

        assert_eq!(store.get("a.md5").await.unwrap(), None);
        assert!(!root.exists());

        store
            .put("a.tar.gz", Bytes::from_static(b"one"), StorageClass::Glacier)
            .await
            .unwrap();
        store
            .put("a.tar.gz", Bytes::from_static(b"two"), StorageClass::Glacier)
            .await
            .unwrap();

        let names: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.tar.gz".to_string()]);
        assert_eq!(store.get("a.tar.gz").await.unwrap().unwrap(), "two");
    }

    #[tokio::test]
    async fn test_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        assert!(store.get("../outside").await.is_err());
    }
}
