//! Local folder storage adapter.
//!
//! Pretends a local directory is a cloud location, the way
//! `original_source`'s `LocalFolderRemote`/`SmallSeaRemote` prototypes treat a
//! plain folder as a remote for debugging. Conditional writes are approximated
//! with `O_EXCL`-style create-only opens for `upload_fresh` and a
//! read-compare-write critical section (guarded by an in-process mutex) for
//! `upload_if_match`; there is no cross-process locking, so this adapter is
//! meant for single-writer local testing and demos, not multi-host production
//! use (mirrors the teacher's own "mostly for debugging purposes" local-folder
//! caveat in spirit).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use corncob_core::domain::errors::CorncobError;
use corncob_core::ports::storage_adapter::{ObjectContent, StorageAdapter};

pub struct LocalFolderAdapter {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalFolderAdapter {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn content_etag(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[async_trait]
impl StorageAdapter for LocalFolderAdapter {
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError> {
        let object_path = self.object_path(path);
        match std::fs::read(&object_path) {
            Ok(bytes) => {
                let etag = content_etag(&bytes);
                Ok(ObjectContent { bytes, etag })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CorncobError::NotFound(path.to_string()))
            }
            Err(e) => Err(CorncobError::Transport(format!("read {path}: {e}"))),
        }
    }

    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        let _guard = self.write_lock.lock().unwrap();
        write_atomically(&self.object_path(path), bytes)?;
        Ok(content_etag(bytes))
    }

    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        let _guard = self.write_lock.lock().unwrap();
        let object_path = self.object_path(path);
        if let Some(parent) = object_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CorncobError::Transport(format!("create dir: {e}")))?;
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&object_path)
        {
            Ok(mut file) => {
                file.write_all(bytes)
                    .map_err(|e| CorncobError::Transport(format!("write {path}: {e}")))?;
                Ok(content_etag(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(CorncobError::AlreadyExists(path.to_string()))
            }
            Err(e) => Err(CorncobError::Transport(format!("create {path}: {e}"))),
        }
    }

    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        let _guard = self.write_lock.lock().unwrap();
        let object_path = self.object_path(path);
        let current = std::fs::read(&object_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CorncobError::NotFound(path.to_string())
            } else {
                CorncobError::Transport(format!("read {path}: {e}"))
            }
        })?;
        if content_etag(&current) != etag {
            return Err(CorncobError::ETagMismatch {
                path: path.to_string(),
                expected: etag.to_string(),
            });
        }
        write_atomically(&object_path, bytes)?;
        Ok(content_etag(bytes))
    }
}

fn write_atomically(object_path: &Path, bytes: &[u8]) -> Result<(), CorncobError> {
    if let Some(parent) = object_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CorncobError::Transport(format!("create dir: {e}")))?;
    }
    let tmp_path = object_path.with_extension("tmp-write");
    std::fs::write(&tmp_path, bytes)
        .map_err(|e| CorncobError::Transport(format!("write temp: {e}")))?;
    std::fs::rename(&tmp_path, object_path)
        .map_err(|e| CorncobError::Transport(format!("rename into place: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_fresh_then_download_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalFolderAdapter::new(dir.path()).unwrap();
        adapter.upload_fresh("latest-link.yaml", b"hello", "application/yaml").await.unwrap();
        let content = adapter.download("latest-link.yaml").await.unwrap();
        assert_eq!(content.bytes, b"hello");
    }

    #[tokio::test]
    async fn upload_fresh_rejects_a_second_write_at_the_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalFolderAdapter::new(dir.path()).unwrap();
        adapter.upload_fresh("B-abc.bundle", b"one", "application/octet-stream").await.unwrap();
        let err = adapter
            .upload_fresh("B-abc.bundle", b"two", "application/octet-stream")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn upload_if_match_rejects_a_stale_etag() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalFolderAdapter::new(dir.path()).unwrap();
        let etag = adapter.upload_fresh("latest-link.yaml", b"v1", "application/yaml").await.unwrap();
        adapter
            .upload_if_match("latest-link.yaml", b"v2", &etag, "application/yaml")
            .await
            .unwrap();
        let err = adapter
            .upload_if_match("latest-link.yaml", b"v3", &etag, "application/yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::ETagMismatch { .. }));
    }

    #[tokio::test]
    async fn download_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalFolderAdapter::new(dir.path()).unwrap();
        let err = adapter.download("latest-link.yaml").await.unwrap_err();
        assert!(matches!(err, CorncobError::NotFound(_)));
    }
}
