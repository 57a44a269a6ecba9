//! The config engine: every read and write of the dashboard configuration.
//!
//! Reads flow persistence -> redactor -> admin filter. Saves flow incoming ->
//! reconciler (against the persisted snapshot and its global index) ->
//! persistence -> redactor. Import replaces the document wholesale without
//! reconciliation; export returns it with real secret values.
//!
//! Load-reconcile-save sequences are serialized by an in-process mutex so two
//! concurrent saves cannot lose each other's updates.

use std::sync::Arc;

use homedash_storage::DocumentStore;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::crypto::SecretCipher;
use crate::document::{Document, Layout, Page};
use crate::error::{DocumentError, EngineError};
use crate::filter::apply_admin_filter;
use crate::index::ItemIndex;
use crate::persistence::PersistenceGateway;
use crate::reconcile::{ReconcileWarning, Reconciled, Reconciler};
use crate::redact::redact;

/// Result of a successful save.
#[derive(Debug)]
pub struct SaveOutcome {
    /// The redacted form of what was persisted.
    pub document: Document,
    pub warnings: Vec<ReconcileWarning>,
}

/// Mediates every read and write of the persisted configuration.
pub struct ConfigEngine {
    gateway: PersistenceGateway,
    cipher: Option<SecretCipher>,
    write_lock: Mutex<()>,
}

impl ConfigEngine {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            gateway: PersistenceGateway::new(store),
            cipher: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Seal newly supplied secrets with `cipher` before they are persisted.
    #[must_use]
    pub fn with_cipher(mut self, cipher: SecretCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// The configuration as a principal may see it: redacted and, for
    /// non-admins, without admin-only items and pages.
    pub async fn read(&self, is_admin: bool) -> Document {
        let mut doc = self.gateway.load().await;
        doc.strip_transient();
        apply_admin_filter(redact(&doc), is_admin)
    }

    /// Save a client-authored document.
    ///
    /// Top-level keys in `incoming` overwrite the persisted ones. `layout` and
    /// `pages` are replaced wholesale when present and kept otherwise; secrets
    /// inside them are reconciled item by item.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Document`] if `incoming` is not an object, has a
    ///   malformed `layout`/`pages`, or repeats an item id.
    /// - [`EngineError::Crypto`] if sealing a new secret fails.
    /// - [`EngineError::Storage`] / [`EngineError::Unreadable`] if the persisted
    ///   document cannot be loaded. Nothing is written.
    /// - [`EngineError::Storage`] / [`EngineError::Serialization`] if the write
    ///   fails. The previous document is left in place.
    pub async fn save(&self, incoming: Value) -> Result<SaveOutcome, EngineError> {
        let Value::Object(incoming) = incoming else {
            return Err(DocumentError::Malformed {
                reason: "configuration must be a JSON object".to_owned(),
            }
            .into());
        };

        let _guard = self.write_lock.lock().await;
        let persisted = self.gateway.load_for_write().await?;
        let candidate = merge_over(&persisted, incoming)?;
        candidate.check_unique_ids()?;

        let index = ItemIndex::build(&persisted);
        let Reconciled { document, warnings } = Reconciler::new(&persisted, &index)
            .with_cipher(self.cipher.as_ref())
            .reconcile(candidate)?;

        self.gateway.save(&document).await?;
        info!(
            items = document.items().len(),
            pages = document.pages.len(),
            warnings = warnings.len(),
            "config saved"
        );

        Ok(SaveOutcome {
            document: redact(&document),
            warnings,
        })
    }

    /// The full persisted document, real secret values included.
    pub async fn export(&self) -> Document {
        self.gateway.load().await
    }

    /// Replace the persisted document wholesale, bypassing reconciliation.
    ///
    /// The caller is trusted to supply a complete, secret-bearing document
    /// such as a prior export. It is stored as given except for redaction
    /// flags and duplication markers, which never reach disk. Returns its
    /// redacted form.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Document`] if `incoming` is not an object, has no
    ///   `layout`, is otherwise malformed, or repeats an item id.
    /// - [`EngineError::Storage`] / [`EngineError::Serialization`] if the write fails.
    pub async fn import(&self, incoming: Value) -> Result<Document, EngineError> {
        if !incoming.as_object().is_some_and(|o| o.contains_key("layout")) {
            return Err(DocumentError::Malformed {
                reason: "imported configuration must be an object with a layout".to_owned(),
            }
            .into());
        }
        let mut doc = Document::from_value(incoming)?;
        doc.check_unique_ids()?;
        doc.strip_transient();

        let _guard = self.write_lock.lock().await;
        self.gateway.save(&doc).await?;
        info!(items = doc.items().len(), pages = doc.pages.len(), "config imported");

        Ok(redact(&doc))
    }
}

impl std::fmt::Debug for ConfigEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEngine")
            .field("gateway", &self.gateway)
            .field("sealing", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}

/// Overlay incoming top-level keys onto the persisted document.
fn merge_over(persisted: &Document, mut incoming: Map<String, Value>) -> Result<Document, DocumentError> {
    let malformed = |key: &str, e: serde_json::Error| DocumentError::Malformed {
        reason: format!("{key}: {e}"),
    };

    let layout: Layout = match incoming.remove("layout") {
        Some(value) => serde_json::from_value(value).map_err(|e| malformed("layout", e))?,
        None => persisted.layout.clone(),
    };
    let pages: Vec<Page> = match incoming.remove("pages") {
        Some(value) => serde_json::from_value(value).map_err(|e| malformed("pages", e))?,
        None => persisted.pages.clone(),
    };

    let mut settings = persisted.settings.clone();
    settings.extend(incoming);

    Ok(Document {
        layout,
        pages,
        settings,
    })
}
