//! Mutable traversal over every layout container of a [`Document`].
//!
//! The redactor, the admin filter, and the reconciler are all [`VisitMut`]
//! implementations: each overrides the hook it cares about and calls the
//! matching `walk_*` function to keep descending. Every hook receives the
//! [`Container`] it is operating in, so a visitor can tell the home layout,
//! a page, and a group apart.

use crate::document::{Document, Item};

/// Desktop or mobile arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Desktop,
    Mobile,
}

impl Variant {
    pub const BOTH: [Self; 2] = [Self::Desktop, Self::Mobile];
}

/// Which array of items is being visited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    /// `layout.desktop` / `layout.mobile` of the home page.
    Main(Variant),
    /// `pages[id].layout.desktop` / `.mobile`.
    Page { page_id: String, variant: Variant },
    /// `config.items` of the group widget with this id.
    Group { group_id: String },
}

/// A visitor over a document's item tree.
pub trait VisitMut {
    fn visit_items(&mut self, container: &Container, items: &mut Vec<Item>) {
        walk_items(self, container, items);
    }

    fn visit_item(&mut self, container: &Container, item: &mut Item) {
        let _ = container;
        walk_item(self, item);
    }
}

/// Visit the home layout, then every page, in document order.
pub fn walk_document<V: VisitMut + ?Sized>(visitor: &mut V, doc: &mut Document) {
    for variant in Variant::BOTH {
        visitor.visit_items(&Container::Main(variant), doc.layout.variant_mut(variant));
    }
    for page in &mut doc.pages {
        for variant in Variant::BOTH {
            let container = Container::Page {
                page_id: page.id.clone(),
                variant,
            };
            visitor.visit_items(&container, page.layout.variant_mut(variant));
        }
    }
}

pub fn walk_items<V: VisitMut + ?Sized>(visitor: &mut V, container: &Container, items: &mut [Item]) {
    for item in items {
        visitor.visit_item(container, item);
    }
}

/// Descend into a group widget's members. No-op for other items.
pub fn walk_item<V: VisitMut + ?Sized>(visitor: &mut V, item: &mut Item) {
    let container = Container::Group {
        group_id: item.id.clone(),
    };
    if let Some(children) = item.group_items_mut() {
        visitor.visit_items(&container, children);
    }
}
