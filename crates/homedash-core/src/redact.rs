//! Client-safe view of the configuration.
//!
//! Every registered secret is removed from its config object. When the value
//! was non-empty, the matching `_has<Field>` flag is set to `true` in the same
//! object so the client knows a secret exists server-side. For dual widgets
//! the flags land on the sub-widget's config, not the outer one.

use serde_json::Value;

use crate::document::{Document, Fields, Item};
use crate::schema::{SecretField, secret_fields_for};
use crate::visit::{Container, VisitMut, walk_document, walk_item};

/// Return a deep copy of `doc` with all secrets replaced by presence flags.
///
/// Redacting an already redacted document changes nothing.
#[must_use]
pub fn redact(doc: &Document) -> Document {
    let mut out = doc.clone();
    walk_document(&mut Redactor, &mut out);
    out
}

struct Redactor;

impl VisitMut for Redactor {
    fn visit_item(&mut self, _container: &Container, item: &mut Item) {
        redact_item(item);
        walk_item(self, item);
    }
}

fn redact_item(item: &mut Item) {
    for path in secret_fields_for(&item.kind) {
        if let Some(fields) = item.secret_fields_mut(path) {
            redact_field(fields, path.field());
        }
    }
}

fn redact_field(fields: &mut Fields, field: SecretField) {
    let present = field.is_supplied(fields);
    fields.remove(field.key());
    if present {
        fields.insert(field.flag().to_owned(), Value::Bool(true));
    }
}
