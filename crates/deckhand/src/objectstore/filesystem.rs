//! Filesystem-backed object store.
//!
//! Objects live as flat files under one root directory. Locations are
//! plain file names (`{uuid}_{sanitized name}`), so anything containing
//! a path separator or parent reference is rejected outright.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ObjectStore, ObjectStoreError};
use crate::staging::sanitize_filename;

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> Result<PathBuf, ObjectStoreError> {
        if location.is_empty()
            || location.contains('/')
            || location.contains('\\')
            || location.contains("..")
        {
            return Err(ObjectStoreError::InvalidLocation(location.to_string()));
        }
        Ok(self.root.join(location))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, ObjectStoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ObjectStoreError::Write {
                name: name.to_string(),
                source: e,
            })?;

        let location = format!("{}_{}", Uuid::new_v4(), sanitize_filename(name));
        let path = self.root.join(&location);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ObjectStoreError::Write {
                name: name.to_string(),
                source: e,
            })?;

        Ok(location)
    }

    async fn download(&self, location: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.resolve(location)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| ObjectStoreError::Read {
                location: location.to_string(),
                source: e,
            })
    }

    async fn signed_url(&self, location: &str, ttl_secs: u64) -> Result<String, ObjectStoreError> {
        let path = self.resolve(location)?;
        let expires = Utc::now().timestamp() + ttl_secs as i64;
        Ok(format!("file://{}?expires={}", path.display(), expires))
    }

    async fn delete(&self, location: &str) -> Result<(), ObjectStoreError> {
        let path = self.resolve(location)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ObjectStoreError::Delete {
                location: location.to_string(),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_download() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let location = store.upload("pitch.pdf", b"deck bytes").await.unwrap();
        assert!(location.ends_with("_pitch.pdf"));

        let bytes = store.download(&location).await.unwrap();
        assert_eq!(bytes, b"deck bytes");
    }

    #[tokio::test]
    async fn test_upload_same_name_twice() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let a = store.upload("deck.pdf", b"one").await.unwrap();
        let b = store.upload("deck.pdf", b"two").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.download(&a).await.unwrap(), b"one");
        assert_eq!(store.download(&b).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_traversal_locations_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(temp.path());

        for bad in ["../secret", "a/b", "..", "", "dir\\file"] {
            let result = store.download(bad).await;
            assert!(
                matches!(result, Err(ObjectStoreError::InvalidLocation(_))),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let location = store.upload("gone.pdf", b"x").await.unwrap();
        store.delete(&location).await.unwrap();

        assert!(matches!(
            store.download(&location).await,
            Err(ObjectStoreError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let result = store.download("0000_missing.pdf").await;
        assert!(matches!(result, Err(ObjectStoreError::Read { .. })));
    }

    #[tokio::test]
    async fn test_signed_url_shape() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let location = store.upload("url.pdf", b"x").await.unwrap();
        let url = store.signed_url(&location, 600).await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.contains(&location));
        assert!(url.contains("expires="));
    }
}
