//! In-memory document store for testing.
//!
//! Holds the document in an `Option<Vec<u8>>` behind a `RwLock`. Nothing is
//! persisted; all data is lost when the process exits.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{DocumentStore, StorageError};

/// An in-memory [`DocumentStore`].
///
/// Clones share the same buffer, so a test can keep a handle and inspect
/// what the engine wrote.
///
/// # Examples
///
/// ```
/// # use homedash_storage::{DocumentStore, MemoryStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.write(b"{}").await.unwrap();
/// assert_eq!(store.read().await.unwrap(), Some(b"{}".to_vec()));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Option<Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `contents`.
    #[must_use]
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(RwLock::new(Some(contents.into()))),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().await.clone())
    }

    async fn write(&self, contents: &[u8]) -> Result<(), StorageError> {
        *self.data.write().await = Some(contents.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_owned()
    }
}
