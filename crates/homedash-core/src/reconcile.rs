//! Save-time reconciliation of a client-authored document.
//!
//! The client only ever sees redacted configs, so a save arrives with
//! `_has<Field>` flags where secrets used to be. Before the document is
//! persisted the reconciler walks the incoming tree and, per item:
//!
//! 1. If it carries a `_duplicatedFrom` marker, copies the source item's
//!    secrets (found through the global index) into the new item.
//! 2. Otherwise looks up the item's previous state, first in the matching
//!    container of the persisted document, then through the global index so
//!    relocated items keep their secrets. For every flagged secret the client
//!    did not supply a literal value for, the previous value is restored.
//! 3. Strips every flag and marker so none of them reach disk.
//!
//! A missing source, a missing prior item, or an unknown type never aborts the
//! save. Those cases are recorded as [`ReconcileWarning`]s and the item is
//! only cleaned up.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::crypto::{SecretCipher, is_sealed};
use crate::document::{Document, Item};
use crate::error::CryptoError;
use crate::index::ItemIndex;
use crate::schema::{FieldPath, secret_fields_for};
use crate::visit::{Container, VisitMut, walk_document, walk_item};

/// A non-fatal anomaly found while reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ReconcileWarning {
    /// The item named by a duplication marker does not exist.
    MissingDuplicateSource { item_id: String, source_id: String },
    /// Flags were set but the item has no previous state anywhere.
    MissingPrior { item_id: String, fields: Vec<String> },
    /// The previous state exists but holds no value for a flagged secret.
    MissingPriorSecret { item_id: String, field: String },
}

/// Output of a reconciliation pass.
#[derive(Debug)]
pub struct Reconciled {
    /// The document to persist: secrets restored, transient keys stripped.
    pub document: Document,
    pub warnings: Vec<ReconcileWarning>,
}

/// Restores secrets into an incoming document from the persisted one.
pub struct Reconciler<'a> {
    persisted: &'a Document,
    index: &'a ItemIndex<'a>,
    cipher: Option<&'a SecretCipher>,
    warnings: Vec<ReconcileWarning>,
    failure: Option<CryptoError>,
}

impl<'a> Reconciler<'a> {
    /// `index` must be built from `persisted`.
    #[must_use]
    pub fn new(persisted: &'a Document, index: &'a ItemIndex<'a>) -> Self {
        Self {
            persisted,
            index,
            cipher: None,
            warnings: Vec::new(),
            failure: None,
        }
    }

    /// Seal literal secrets supplied by the client with `cipher`.
    #[must_use]
    pub fn with_cipher(mut self, cipher: Option<&'a SecretCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Reconcile `incoming` against the persisted document.
    ///
    /// # Errors
    ///
    /// Returns a [`CryptoError`] if sealing a newly supplied secret fails.
    pub fn reconcile(mut self, mut incoming: Document) -> Result<Reconciled, CryptoError> {
        walk_document(&mut self, &mut incoming);
        if let Some(err) = self.failure {
            return Err(err);
        }
        Ok(Reconciled {
            document: incoming,
            warnings: self.warnings,
        })
    }

    fn warn(&mut self, warning: ReconcileWarning) {
        warn!(?warning, "config reconciliation warning");
        self.warnings.push(warning);
    }

    /// The item with `id` in the persisted counterpart of `container`.
    fn local_prior(&self, container: &Container, id: &str) -> Option<&'a Item> {
        let items: &'a [Item] = match container {
            Container::Main(variant) => self.persisted.layout.variant(*variant),
            Container::Page { page_id, variant } => {
                self.persisted.page(page_id)?.layout.variant(*variant)
            }
            Container::Group { group_id } => self.index.get(group_id)?.group_items()?,
        };
        items.iter().find(|item| item.id == id)
    }

    fn seal_supplied(&mut self, item: &mut Item) {
        let Some(cipher) = self.cipher else {
            return;
        };
        for path in secret_fields_for(&item.kind) {
            let key = path.field().key();
            let Some(Value::String(value)) = item
                .secret_fields_mut(path)
                .and_then(|fields| fields.get_mut(key))
            else {
                continue;
            };
            if value.is_empty() || is_sealed(value) {
                continue;
            }
            match cipher.seal(value) {
                Ok(sealed) => *value = sealed,
                Err(e) => {
                    self.failure.get_or_insert(e);
                }
            }
        }
    }

    fn copy_from_source(&mut self, item: &mut Item, source_id: &str) {
        let Some(source) = self.index.get(source_id) else {
            self.warn(ReconcileWarning::MissingDuplicateSource {
                item_id: item.id.clone(),
                source_id: source_id.to_owned(),
            });
            return;
        };

        for path in secret_fields_for(&item.kind) {
            let field = path.field();
            let Some(value) = source
                .secret_fields(path)
                .filter(|fields| field.is_supplied(fields))
                .and_then(|fields| fields.get(field.key()))
            else {
                continue;
            };
            let Some(fields) = item.secret_fields_mut(path) else {
                continue;
            };
            if !field.is_supplied(fields) {
                fields.insert(field.key().to_owned(), value.clone());
                debug!(item_id = %item.id, source_id, field = %path, "copied secret from duplicate source");
            }
        }
    }

    fn restore(&mut self, container: &Container, item: &mut Item) {
        let pending: Vec<FieldPath> = secret_fields_for(&item.kind)
            .into_iter()
            .filter(|path| {
                item.secret_fields(*path).is_some_and(|fields| {
                    path.field().is_flagged(fields) && !path.field().is_supplied(fields)
                })
            })
            .collect();
        if pending.is_empty() {
            return;
        }

        let prior = if item.id.is_empty() {
            None
        } else {
            self.local_prior(container, &item.id)
                .or_else(|| self.index.get(&item.id))
        };
        let Some(prior) = prior else {
            self.warn(ReconcileWarning::MissingPrior {
                item_id: item.id.clone(),
                fields: pending.iter().map(ToString::to_string).collect(),
            });
            return;
        };

        for path in pending {
            let field = path.field();
            let value = prior
                .secret_fields(path)
                .filter(|fields| field.is_supplied(fields))
                .and_then(|fields| fields.get(field.key()))
                .cloned();
            let restored = value
                .and_then(|value| {
                    item.secret_fields_mut(path)
                        .map(|fields| {
                            fields.insert(field.key().to_owned(), value);
                        })
                })
                .is_some();
            if restored {
                debug!(item_id = %item.id, field = %path, "restored secret");
            } else {
                self.warn(ReconcileWarning::MissingPriorSecret {
                    item_id: item.id.clone(),
                    field: path.to_string(),
                });
            }
        }
    }
}

impl VisitMut for Reconciler<'_> {
    fn visit_item(&mut self, container: &Container, item: &mut Item) {
        self.seal_supplied(item);
        if let Some(source_id) = item.duplicated_from().map(str::to_owned) {
            self.copy_from_source(item, &source_id);
        } else {
            self.restore(container, item);
        }
        item.strip_transient();
        walk_item(self, item);
    }
}
