//! Admin-only visibility.
//!
//! Non-admin principals never see items or pages marked `adminOnly`. Items are
//! removed from every layout array, including group members, so an admin-only
//! widget cannot hide inside a visible group. A hidden page disappears with
//! everything on it.

use crate::document::{Document, Item};
use crate::visit::{Container, VisitMut, walk_document, walk_items};

/// Filter `doc` for a principal. Admins get the document back unchanged.
#[must_use]
pub fn apply_admin_filter(mut doc: Document, is_admin: bool) -> Document {
    if is_admin {
        return doc;
    }
    doc.pages.retain(|page| !page.is_admin_only());
    walk_document(&mut AdminFilter, &mut doc);
    doc
}

struct AdminFilter;

impl VisitMut for AdminFilter {
    fn visit_items(&mut self, container: &Container, items: &mut Vec<Item>) {
        items.retain(|item| !item.is_admin_only());
        walk_items(self, container, items);
    }
}
