//! File-backed document store, the production default.
//!
//! The document lives in one file at a canonical path. Writes go to a sibling
//! temp file which is then renamed over the canonical path, so a reader sees
//! either the old document or the new one and a failed write leaves the old
//! file in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{DocumentStore, StorageError};

/// A [`DocumentStore`] backed by a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store for the file at `path`.
    ///
    /// Nothing is touched on disk until the first read or write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, e: &std::io::Error) -> StorageError {
        StorageError::Write {
            location: self.location(),
            reason: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for FileStore {
    async fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                location: self.location(),
                reason: e.to_string(),
            }),
        }
    }

    async fn write(&self, contents: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::CreateDir {
                    path: parent.display().to_string(),
                    reason: e.to_string(),
                })?;
        }

        let tmp = self.temp_path();
        if let Err(e) = tokio::fs::write(&tmp, contents).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(&e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(&e));
        }

        debug!(path = %self.path.display(), bytes = contents.len(), "document written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
