//! The persisted dashboard configuration as a typed tree.
//!
//! A [`Document`] holds the home layout, the extra pages, and every other
//! top-level setting as opaque JSON. Items are tagged by their `type`: a
//! `group-widget` carries nested items in `config.items`, a `dual-widget`
//! carries two [`SubWidget`]s in `config.topWidget` / `config.bottomWidget`,
//! and every other type carries a flat config object. Unknown keys are kept
//! at every level so the wire format round-trips.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::DocumentError;
use crate::schema::{self, DUAL_WIDGET, DUPLICATED_FROM, DualSlot, FieldPath, GROUP_WIDGET};
use crate::visit::{Container, Variant, VisitMut, walk_document, walk_item};

/// A JSON object.
pub type Fields = Map<String, Value>;

/// The single persisted configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Layouts of the home page.
    #[serde(default, deserialize_with = "null_as_default")]
    pub layout: Layout,
    /// Additional pages, in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<Page>,
    /// Every other top-level key (title, search provider, theme, notes, ...).
    #[serde(flatten)]
    pub settings: Fields,
}

/// The desktop and mobile arrangement of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default, deserialize_with = "null_as_default")]
    pub desktop: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mobile: Vec<Item>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// A page with its own layout. The display name and any other keys stay in
/// `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(rename = "adminOnly", default, skip_serializing_if = "Option::is_none")]
    pub admin_only: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layout: Layout,
    #[serde(flatten)]
    pub extra: Fields,
}

/// A placed dashboard element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Item {
    /// Unique across the whole document, group members included. Numeric ids
    /// are read as their decimal string.
    pub id: String,
    /// The `type` discriminator selecting the secret schema.
    pub kind: String,
    pub admin_only: Option<bool>,
    pub config: Option<ItemConfig>,
    /// Keys other than `id`, `type`, `adminOnly`, and `config`.
    pub extra: Fields,
    wire: WireKeys,
}

/// Whether `id` / `type` were present on the wire, so an explicit empty
/// string survives a round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WireKeys {
    id: bool,
    kind: bool,
}

/// An item's `config` object, split into flat fields and nested widgets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemConfig {
    /// Config keys other than the nested ones. Secrets live here.
    pub fields: Fields,
    pub nested: Nested,
}

/// The nested part of a container widget's config.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Nested {
    #[default]
    None,
    /// `config.items` of a group widget.
    Group(Vec<Item>),
    /// `config.topWidget` and `config.bottomWidget` of a dual widget.
    Dual {
        top: Option<SubWidget>,
        bottom: Option<SubWidget>,
    },
}

/// One half of a dual widget. Sub-widgets do not nest further.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubWidget {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Fields>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Wire shape of an item before its config is split by type.
#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    id: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(rename = "adminOnly", default)]
    admin_only: Option<bool>,
    #[serde(default)]
    config: Option<Fields>,
    #[serde(flatten)]
    extra: Fields,
}

fn malformed(reason: impl std::fmt::Display) -> DocumentError {
    DocumentError::Malformed {
        reason: reason.to_string(),
    }
}

/// `null` reads as the default value.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Ids may be strings or numbers; `null` reads as no id.
fn lenient_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let id = Option::<Value>::deserialize(de)?
        .map(id_string)
        .transpose()
        .map_err(serde::de::Error::custom)?
        .flatten();
    Ok(id.unwrap_or_default())
}

/// Text of an `id` or `type` value. `Ok(None)` for `null`.
fn id_string(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected a string or number, found {other}")),
    }
}

impl Document {
    /// Parse a client-supplied or persisted JSON value.
    ///
    /// `null` is accepted wherever a layout, a page list, an item list, or an
    /// id is expected, and numeric ids are read as strings.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Malformed`] if `value` is not an object or any
    /// part of it has the wrong shape.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        if !value.is_object() {
            return Err(malformed("configuration must be a JSON object"));
        }
        serde_json::from_value(value).map_err(malformed)
    }

    /// Find a page by id.
    #[must_use]
    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Every top-level layout container: home desktop/mobile, then each
    /// page's desktop/mobile. Group members are not included.
    #[must_use]
    pub fn containers(&self) -> Vec<(Container, &[Item])> {
        let mut out = Vec::with_capacity(2 + self.pages.len() * 2);
        for variant in Variant::BOTH {
            out.push((Container::Main(variant), self.layout.variant(variant)));
        }
        for page in &self.pages {
            for variant in Variant::BOTH {
                let container = Container::Page {
                    page_id: page.id.clone(),
                    variant,
                };
                out.push((container, page.layout.variant(variant)));
            }
        }
        out
    }

    /// Every item in the document, depth first, group members included.
    #[must_use]
    pub fn items(&self) -> Vec<&Item> {
        fn collect<'a>(items: &'a [Item], out: &mut Vec<&'a Item>) {
            for item in items {
                out.push(item);
                if let Some(children) = item.group_items() {
                    collect(children, out);
                }
            }
        }

        let mut out = Vec::new();
        for (_, items) in self.containers() {
            collect(items, &mut out);
        }
        out
    }

    /// Remove redaction flags and duplication markers from every item.
    pub fn strip_transient(&mut self) {
        struct Stripper;

        impl VisitMut for Stripper {
            fn visit_item(&mut self, _container: &Container, item: &mut Item) {
                item.strip_transient();
                walk_item(self, item);
            }
        }

        walk_document(&mut Stripper, self);
    }

    /// Reject documents in which a non-empty item id occurs twice.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::DuplicateItemId`] naming the first repeat.
    pub fn check_unique_ids(&self) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        for item in self.items() {
            if !item.id.is_empty() && !seen.insert(item.id.as_str()) {
                return Err(DocumentError::DuplicateItemId {
                    id: item.id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Layout {
    #[must_use]
    pub fn variant(&self, variant: Variant) -> &[Item] {
        match variant {
            Variant::Desktop => &self.desktop,
            Variant::Mobile => &self.mobile,
        }
    }

    pub fn variant_mut(&mut self, variant: Variant) -> &mut Vec<Item> {
        match variant {
            Variant::Desktop => &mut self.desktop,
            Variant::Mobile => &mut self.mobile,
        }
    }
}

impl Page {
    #[must_use]
    pub fn is_admin_only(&self) -> bool {
        self.admin_only == Some(true)
    }
}

impl Item {
    #[must_use]
    pub fn is_admin_only(&self) -> bool {
        self.admin_only == Some(true)
    }

    /// Flat config fields, if the item has a config.
    #[must_use]
    pub fn fields(&self) -> Option<&Fields> {
        self.config.as_ref().map(|c| &c.fields)
    }

    pub fn fields_mut(&mut self) -> Option<&mut Fields> {
        self.config.as_mut().map(|c| &mut c.fields)
    }

    /// Members of a group widget.
    #[must_use]
    pub fn group_items(&self) -> Option<&[Item]> {
        match self.config.as_ref().map(|c| &c.nested) {
            Some(Nested::Group(items)) => Some(items),
            _ => None,
        }
    }

    pub fn group_items_mut(&mut self) -> Option<&mut Vec<Item>> {
        match self.config.as_mut().map(|c| &mut c.nested) {
            Some(Nested::Group(items)) => Some(items),
            _ => None,
        }
    }

    /// One half of a dual widget.
    #[must_use]
    pub fn sub_widget(&self, slot: DualSlot) -> Option<&SubWidget> {
        match self.config.as_ref().map(|c| &c.nested) {
            Some(Nested::Dual { top, bottom }) => match slot {
                DualSlot::Top => top.as_ref(),
                DualSlot::Bottom => bottom.as_ref(),
            },
            _ => None,
        }
    }

    pub fn sub_widget_mut(&mut self, slot: DualSlot) -> Option<&mut SubWidget> {
        match self.config.as_mut().map(|c| &mut c.nested) {
            Some(Nested::Dual { top, bottom }) => match slot {
                DualSlot::Top => top.as_mut(),
                DualSlot::Bottom => bottom.as_mut(),
            },
            _ => None,
        }
    }

    /// The config object that holds the secret at `path`.
    #[must_use]
    pub fn secret_fields(&self, path: FieldPath) -> Option<&Fields> {
        match path {
            FieldPath::Config(_) => self.fields(),
            FieldPath::Dual(slot, _) => self.sub_widget(slot)?.config.as_ref(),
        }
    }

    pub fn secret_fields_mut(&mut self, path: FieldPath) -> Option<&mut Fields> {
        match path {
            FieldPath::Config(_) => self.fields_mut(),
            FieldPath::Dual(slot, _) => self.sub_widget_mut(slot)?.config.as_mut(),
        }
    }

    /// The id named by a duplication marker on the item or in its config.
    #[must_use]
    pub fn duplicated_from(&self) -> Option<&str> {
        self.extra
            .get(DUPLICATED_FROM)
            .or_else(|| self.fields()?.get(DUPLICATED_FROM))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Remove redaction flags and duplication markers from this item.
    ///
    /// Covers the item itself, its config, and both dual sub-widgets. Group
    /// members are separate items and are not touched.
    pub fn strip_transient(&mut self) {
        schema::strip_transient(&mut self.extra);
        let Some(config) = self.config.as_mut() else {
            return;
        };
        schema::strip_transient(&mut config.fields);
        if let Nested::Dual { top, bottom } = &mut config.nested {
            for sub in [top, bottom].into_iter().flatten() {
                schema::strip_transient(&mut sub.extra);
                if let Some(fields) = sub.config.as_mut() {
                    schema::strip_transient(fields);
                }
            }
        }
    }
}

impl TryFrom<Value> for Item {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let raw: RawItem = serde_json::from_value(value).map_err(malformed)?;
        let id = raw
            .id
            .map(id_string)
            .transpose()
            .map_err(|e| malformed(format!("item id: {e}")))?
            .flatten();
        let kind = raw
            .kind
            .map(id_string)
            .transpose()
            .map_err(|e| malformed(format!("item type: {e}")))?
            .flatten();
        let wire = WireKeys {
            id: id.is_some(),
            kind: kind.is_some(),
        };
        let id = id.unwrap_or_default();
        let kind = kind.unwrap_or_default();
        let config = raw
            .config
            .map(|fields| ItemConfig::split(&id, &kind, fields))
            .transpose()?;
        Ok(Self {
            id,
            kind,
            admin_only: raw.admin_only,
            config,
            extra: raw.extra,
            wire,
        })
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        let mut map = Fields::new();
        if item.wire.id || !item.id.is_empty() {
            map.insert("id".to_owned(), Value::String(item.id));
        }
        if item.wire.kind || !item.kind.is_empty() {
            map.insert("type".to_owned(), Value::String(item.kind));
        }
        if let Some(admin_only) = item.admin_only {
            map.insert("adminOnly".to_owned(), Value::Bool(admin_only));
        }
        if let Some(config) = item.config {
            map.insert("config".to_owned(), Value::Object(config.join()));
        }
        map.extend(item.extra);
        Value::Object(map)
    }
}

impl ItemConfig {
    /// Pull the nested part of a raw config out according to the item type.
    fn split(id: &str, kind: &str, mut fields: Fields) -> Result<Self, DocumentError> {
        let nested = match kind {
            GROUP_WIDGET => {
                let items = match fields.remove("items") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(v) => serde_json::from_value(v).map_err(|e| {
                        malformed(format!("items of group '{id}': {e}"))
                    })?,
                };
                Nested::Group(items)
            }
            DUAL_WIDGET => {
                let mut slot = |key: &str| -> Result<Option<SubWidget>, DocumentError> {
                    match fields.remove(key) {
                        None | Some(Value::Null) => Ok(None),
                        Some(v) => serde_json::from_value(v)
                            .map(Some)
                            .map_err(|e| malformed(format!("{key} of dual widget '{id}': {e}"))),
                    }
                };
                let top = slot(DualSlot::Top.key())?;
                let bottom = slot(DualSlot::Bottom.key())?;
                Nested::Dual { top, bottom }
            }
            _ => Nested::None,
        };
        Ok(Self { fields, nested })
    }

    /// Reassemble the wire-format config object.
    fn join(self) -> Fields {
        let mut fields = self.fields;
        match self.nested {
            Nested::None => {}
            Nested::Group(items) => {
                let items = items.into_iter().map(Value::from).collect();
                fields.insert("items".to_owned(), Value::Array(items));
            }
            Nested::Dual { top, bottom } => {
                for (slot, sub) in [(DualSlot::Top, top), (DualSlot::Bottom, bottom)] {
                    if let Some(sub) = sub {
                        fields.insert(slot.key().to_owned(), Value::from(sub));
                    }
                }
            }
        }
        fields
    }
}

impl From<SubWidget> for Value {
    fn from(sub: SubWidget) -> Self {
        let mut map = Fields::new();
        if let Some(kind) = sub.kind {
            map.insert("type".to_owned(), Value::String(kind));
        }
        if let Some(config) = sub.config {
            map.insert("config".to_owned(), Value::Object(config));
        }
        map.extend(sub.extra);
        Value::Object(map)
    }
}
