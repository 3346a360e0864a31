/// Object storage for media
///
/// Opaque binary storage for video files and thumbnails. Callers hand over
/// bytes and get back a handle; the handle is all they ever store.

pub mod disk;

pub use disk::DiskObjectStore;

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use uuid::Uuid;

/// Object storage backend trait
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object and return its handle
    async fn put(&self, data: Vec<u8>, content_type: &str) -> ApiResult<String>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, handle: &str) -> ApiResult<()>;

    /// Check if an object exists
    async fn exists(&self, handle: &str) -> ApiResult<bool>;
}

/// Fresh random handle
pub fn new_handle() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Reject anything that is not a handle this store could have produced
pub fn check_handle(handle: &str) -> ApiResult<()> {
    if handle.len() == 32 && handle.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("Invalid media handle: {}", handle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_handles_pass_check() {
        let handle = new_handle();
        assert!(check_handle(&handle).is_ok());
        assert_ne!(handle, new_handle());
    }

    #[test]
    fn test_path_like_handles_rejected() {
        assert!(check_handle("../../etc/passwd").is_err());
        assert!(check_handle("").is_err());
        assert!(check_handle("ab/abcdef").is_err());
    }
}
