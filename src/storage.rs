// src/storage.rs

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::AppError;

/// Opaque key/value store for uploaded image bytes.
///
/// Injected into the outfit handlers through `AppState` so the business
/// logic never touches the filesystem directly. Keys are the stored
/// filenames produced by `utils::files::stored_filename`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Filesystem-backed blob store rooted at the configured upload directory.
/// The same directory is served read-only under `/Uploads`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            AppError::InternalServerError(format!(
                "Failed to create upload directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), AppError> {
        tokio::fs::write(self.path_for(key), bytes)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to store blob {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        tokio::fs::read(self.path_for(key)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Blob {} not found", key))
            } else {
                AppError::InternalServerError(format!("Failed to read blob {}: {}", key, e))
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        tokio::fs::remove_file(self.path_for(key)).await.map_err(|e| {
            AppError::InternalServerError(format!("Failed to delete blob {}: {}", key, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FsBlobStore {
        let dir = std::env::temp_dir().join(format!("styleswap-blobs-{}", uuid::Uuid::new_v4()));
        FsBlobStore::new(dir).expect("Failed to create temp blob store")
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = temp_store();

        store.put("a.png", b"bytes").await.unwrap();
        assert_eq!(store.get("a.png").await.unwrap(), b"bytes");

        store.delete("a.png").await.unwrap();
        assert!(matches!(
            store.get("a.png").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_missing_blob_is_an_error() {
        let store = temp_store();
        assert!(store.delete("missing.jpg").await.is_err());
    }
}
