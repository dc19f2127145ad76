//! Local-directory object store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::ObjectStoreClient;
use crate::error::{DqWatchError, Result};

/// Object store backed by a local directory.
///
/// Buckets are subdirectories of the base path and object names are
/// relative paths inside them. Existing objects are never overwritten.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    base_path: PathBuf,
}

impl FilesystemObjectStore {
    /// Creates a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Root directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        Ok(self.base_path.join(relative_path(bucket, "bucket")?))
    }

    /// Local path an object is written to.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket or object name is empty, absolute, or
    /// escapes its parent directory.
    pub fn object_path(&self, bucket: &str, object_name: &str) -> Result<PathBuf> {
        Ok(self
            .bucket_path(bucket)?
            .join(relative_path(object_name, "object name")?))
    }
}

fn relative_path<'a>(value: &'a str, what: &str) -> Result<&'a Path> {
    let path = Path::new(value);
    let normal = path.components().all(|c| matches!(c, Component::Normal(_)));
    if value.trim().is_empty() || !normal {
        return Err(DqWatchError::configuration(format!(
            "Invalid {what} '{value}': must be a non-empty relative path without '..'"
        )));
    }
    Ok(path)
}

#[async_trait]
impl ObjectStoreClient for FilesystemObjectStore {
    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&path).await.map_err(|e| {
            DqWatchError::io(format!("Failed to create bucket directory {}", path.display()), e)
        })
    }

    async fn upload_object(
        &self,
        bucket: &str,
        object_name: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        let path = self.object_path(bucket, object_name)?;
        let io_error =
            |e| DqWatchError::io(format!("Failed to write object {}", path.display()), e);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let opened = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(DqWatchError::destination(
                    "filesystem",
                    format!("Object {} already exists", path.display()),
                ));
            }
            Err(e) => return Err(io_error(e)),
        };
        file.write_all(&data).await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;

        Ok(())
    }
}
