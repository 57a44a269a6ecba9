//! Persistence gateway: the only part of the engine that touches storage.
//!
//! Read paths use [`PersistenceGateway::load`], which never fails: a document
//! that cannot be read or parsed degrades to an empty dashboard. Saves use
//! [`PersistenceGateway::load_for_write`], which only treats a missing or
//! blank document as empty and fails on everything else.

use std::sync::Arc;

use homedash_storage::DocumentStore;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::EngineError;

/// Parses and serializes the document on top of a [`DocumentStore`].
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
}

impl PersistenceGateway {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load the persisted document, or an empty one.
    ///
    /// For read paths only: a document that cannot be read or parsed is
    /// logged and treated as empty.
    pub async fn load(&self) -> Document {
        match self.load_for_write().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "persisted config unavailable, using empty document");
                Document::default()
            }
        }
    }

    /// Load the persisted document as the base of a write.
    ///
    /// Only a missing or blank document counts as empty. Anything else that
    /// cannot be loaded is an error, so a save never merges over a document
    /// it could not see.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Storage`] if the store cannot be read.
    /// - [`EngineError::Unreadable`] if the stored bytes are not a valid document.
    pub async fn load_for_write(&self) -> Result<Document, EngineError> {
        let Some(bytes) = self.store.read().await? else {
            debug!(location = %self.store.location(), "no persisted config, using empty document");
            return Ok(Document::default());
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!(location = %self.store.location(), "persisted config is empty");
            return Ok(Document::default());
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|value| Document::from_value(value).map_err(|e| e.to_string()))
            .map_err(|reason| EngineError::Unreadable {
                location: self.store.location(),
                reason,
            })
    }

    /// Serialize `doc` and overwrite the persisted document.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Serialization`] if the document cannot be encoded.
    /// - [`EngineError::Storage`] if the write fails; the previous document stays.
    pub async fn save(&self, doc: &Document) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(|e| EngineError::Serialization {
            reason: e.to_string(),
        })?;
        self.store.write(&bytes).await?;
        info!(location = %self.store.location(), bytes = bytes.len(), "config persisted");
        Ok(())
    }
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("location", &self.store.location())
            .finish()
    }
}
