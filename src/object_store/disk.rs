/// Disk-based object storage backend
use crate::{
    error::{ApiError, ApiResult},
    object_store::{check_handle, new_handle, ObjectStore},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores objects on the local filesystem, sharded by the first two
/// characters of the handle.
#[derive(Clone)]
pub struct DiskObjectStore {
    base_path: PathBuf,
}

impl DiskObjectStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// {base}/{first2chars}/{handle}
    fn object_path(&self, handle: &str) -> PathBuf {
        self.base_path.join(&handle[0..2]).join(handle)
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn put(&self, data: Vec<u8>, content_type: &str) -> ApiResult<String> {
        let handle = new_handle();
        let path = self.object_path(&handle);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ApiError::ObjectStore(format!("Failed to create object directory: {}", e))
            })?;
        }

        let size = data.len();
        fs::write(&path, data).await.map_err(|e| {
            ApiError::ObjectStore(format!("Failed to write object {}: {}", handle, e))
        })?;

        tracing::debug!(handle = %handle, content_type, size, "Stored object");
        Ok(handle)
    }

    async fn delete(&self, handle: &str) -> ApiResult<()> {
        check_handle(handle)?;

        match fs::remove_file(self.object_path(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::ObjectStore(format!(
                "Failed to delete object {}: {}",
                handle, e
            ))),
        }
    }

    async fn exists(&self, handle: &str) -> ApiResult<bool> {
        if check_handle(handle).is_err() {
            return Ok(false);
        }

        Ok(fs::try_exists(self.object_path(handle)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_then_delete() {
        let dir = tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path().to_path_buf());

        let handle = store.put(b"frames".to_vec(), "video/mp4").await.unwrap();
        assert!(store.exists(&handle).await.unwrap());

        let on_disk = std::fs::read(store.object_path(&handle)).unwrap();
        assert_eq!(on_disk, b"frames");

        store.delete(&handle).await.unwrap();
        assert!(!store.exists(&handle).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path().to_path_buf());

        let handle = new_handle();
        store.delete(&handle).await.unwrap();
        store.delete(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_directory_sharding() {
        let dir = tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path().to_path_buf());

        let handle = store.put(b"x".to_vec(), "image/png").await.unwrap();
        let path = store.object_path(&handle);

        assert!(path
            .to_string_lossy()
            .contains(&format!("/{}/", &handle[0..2])));
    }

    #[tokio::test]
    async fn test_foreign_handles() {
        let dir = tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path().to_path_buf());

        assert!(!store.exists("../secret").await.unwrap());
        assert!(matches!(
            store.delete("../secret").await,
            Err(ApiError::Validation(_))
        ));
    }
}
