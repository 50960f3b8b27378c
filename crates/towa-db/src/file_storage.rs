//! Filesystem content store for envelope blobs.
//!
//! Blobs are written once and never modified. Each gets a fresh UUIDv7 and
//! lands at `{base_path}/blobs/{first-2-hex}/{next-2-hex}/{uuid}.bin`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use towa_core::{new_v7, ContentStore, Error, Result};

/// Generate storage path from UUID.
///
/// Example: `blobs/01/94/01948f7e-8b2a-7c3d-9e4f-5a6b7c8d9e0f.bin`
pub fn generate_storage_path(uuid: &Uuid) -> String {
    let simple = uuid.simple().to_string();
    format!(
        "blobs/{}/{}/{}.bin",
        &simple[0..2],
        &simple[2..4],
        uuid.as_hyphenated()
    )
}

/// Filesystem-backed [`ContentStore`].
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn blob_path(&self, id: &Uuid) -> PathBuf {
        self.base_path.join(generate_storage_path(id))
    }

    async fn write_blob(&self, id: Uuid, data: &[u8]) -> Result<()> {
        let full_path = self.blob_path(&id);
        debug!(
            subsystem = "storage",
            component = "filesystem",
            op = "put",
            letter_id = %id,
            size = data.len(),
            "Writing blob"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "Blob directory creation failed");
                e
            })?;
        }

        // Temp file + rename so readers never see a partial blob.
        let temp_path = full_path.with_extension("tmp");
        if let Err(e) = write_then_rename(&temp_path, &full_path, data).await {
            warn!(
                subsystem = "storage",
                component = "filesystem",
                op = "put",
                temp_path = %temp_path.display(),
                error = %e,
                "Blob write failed"
            );
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(temp_path = %temp_path.display(), error = %cleanup, "Temp blob cleanup failed");
                }
            }
            return Err(e.into());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    /// Check that the storage directory can write, read and delete files.
    ///
    /// Run at startup so a bad mount or permission problem fails fast.
    pub async fn validate(&self) -> Result<()> {
        let test_dir = self.base_path.join("blobs/.health-check");
        let test_file = test_dir.join("test.bin");
        let data = b"storage-health-check";

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| Error::Storage(format!("create_dir_all({:?}): {}", test_dir, e)))?;
        fs::write(&test_file, data)
            .await
            .map_err(|e| Error::Storage(format!("write({:?}): {}", test_file, e)))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| Error::Storage(format!("read({:?}): {}", test_file, e)))?;
        if read_data != data {
            return Err(Error::Storage("read-back mismatch".to_string()));
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| Error::Storage(format!("remove_file({:?}): {}", test_file, e)))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

async fn write_then_rename(temp_path: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, target).await
}

#[async_trait]
impl ContentStore for FilesystemBackend {
    async fn put(&self, data: &[u8]) -> Result<Uuid> {
        let id = new_v7();
        self.write_blob(id, data).await?;
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Vec<u8>> {
        match fs::read(self.blob_path(&id)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::LetterNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match fs::remove_file(self.blob_path(&id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_path_layout() {
        let id = Uuid::parse_str("01948f7e-8b2a-7c3d-9e4f-5a6b7c8d9e0f").unwrap();
        assert_eq!(
            generate_storage_path(&id),
            "blobs/01/94/01948f7e-8b2a-7c3d-9e4f-5a6b7c8d9e0f.bin"
        );
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());

        let id = store.put(b"opaque envelope bytes").await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), b"opaque envelope bytes");
        assert!(dir.path().join(generate_storage_path(&id)).exists());
    }

    #[tokio::test]
    async fn test_failed_write_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        let id = new_v7();

        // A non-empty directory at the blob path makes the rename fail.
        let target = store.blob_path(&id);
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("occupied"), b"x").unwrap();

        assert!(store.write_blob(id, b"blob").await.is_err());
        assert!(!target.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_put_assigns_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        let a = store.put(b"same").await.unwrap();
        let b = store.put(b"same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_get_missing_is_letter_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        let id = new_v7();
        assert!(matches!(
            store.get(id).await,
            Err(Error::LetterNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        let id = store.put(b"x").await.unwrap();
        store.delete(id).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.is_err());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        let id = store.put(b"x").await.unwrap();
        let tmp = dir.path().join(generate_storage_path(&id)).with_extension("tmp");
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        store.validate().await.unwrap();
        assert!(!dir.path().join("blobs/.health-check").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_blob_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path());
        let id = store.put(b"x").await.unwrap();
        let meta = std::fs::metadata(dir.path().join(generate_storage_path(&id))).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o644);
    }
}
