//! Global id -> item lookup over the persisted document.
//!
//! Built from the pre-write snapshot, never from the incoming document. Every
//! layout container and every group member shares one namespace, which is what
//! lets the reconciler find an item's previous secrets after it was dragged to
//! another page or into a group.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::warn;

use crate::document::{Document, Item};

/// Flat lookup from item id to item.
#[derive(Debug, Default)]
pub struct ItemIndex<'a> {
    items: HashMap<&'a str, &'a Item>,
}

impl<'a> ItemIndex<'a> {
    /// Index every item of `doc`, group members included.
    ///
    /// Items without an id are skipped. If an id repeats (only possible in a
    /// legacy document written before ids were checked), the first occurrence
    /// wins.
    #[must_use]
    pub fn build(doc: &'a Document) -> Self {
        let mut items = HashMap::new();
        for item in doc.items() {
            if item.id.is_empty() {
                continue;
            }
            match items.entry(item.id.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(item);
                }
                Entry::Occupied(_) => {
                    warn!(item_id = %item.id, "duplicate item id in persisted config, keeping first");
                }
            }
        }
        Self { items }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a Item> {
        self.items.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn indexes_all_layouts_pages_and_group_members() {
        let doc = Document::from_value(json!({
            "layout": {
                "desktop": [{"id": "a1", "type": "x"}],
                "mobile": [{"id": "a2", "type": "x"}]
            },
            "pages": [{"id": "p1", "layout": {
                "desktop": [{"id": "g1", "type": "group-widget", "config": {"items": [
                    {"id": "m1", "type": "sonarr-widget", "config": {"apiKey": "k"}}
                ]}}],
                "mobile": [{"id": "b1", "type": "x"}]
            }}]
        }))
        .unwrap();

        let index = ItemIndex::build(&doc);
        assert_eq!(index.len(), 5);
        for id in ["a1", "a2", "g1", "m1", "b1"] {
            assert!(index.get(id).is_some(), "{id} missing");
        }
        assert_eq!(index.get("m1").unwrap().fields().unwrap()["apiKey"], "k");
        assert!(index.get("p1").is_none());
    }

    #[test]
    fn first_occurrence_wins_on_repeat() {
        let doc = Document::from_value(json!({"layout": {
            "desktop": [{"id": "a1", "type": "first"}],
            "mobile": [{"id": "a1", "type": "second"}, {"type": "no-id"}]
        }}))
        .unwrap();

        let index = ItemIndex::build(&doc);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a1").unwrap().kind, "first");
    }

    #[test]
    fn empty_document_has_empty_index() {
        let doc = Document::default();
        assert!(ItemIndex::build(&doc).is_empty());
    }
}
