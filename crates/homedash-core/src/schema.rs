//! Secret schema registry.
//!
//! A closed table mapping an item `type` to the config fields that hold
//! credential material. Unknown types have no secret fields: custom or
//! unrecognized items flow through the pipeline untouched instead of failing.

use serde_json::{Map, Value};

/// Item type of the container widget whose `config.items` holds nested items.
pub const GROUP_WIDGET: &str = "group-widget";

/// Item type of the container widget holding `topWidget` and `bottomWidget`.
pub const DUAL_WIDGET: &str = "dual-widget";

/// Config key of the transient marker naming the item a new item was cloned from.
pub const DUPLICATED_FROM: &str = "_duplicatedFrom";

/// Prefix shared by every redaction flag key.
pub const FLAG_PREFIX: &str = "_has";

/// A config key whose value is credential material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretField {
    ApiToken,
    ApiKey,
    Password,
    Username,
}

impl SecretField {
    /// Every known secret field.
    pub const ALL: [Self; 4] = [Self::ApiToken, Self::ApiKey, Self::Password, Self::Username];

    /// The config key holding the secret value.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::ApiToken => "apiToken",
            Self::ApiKey => "apiKey",
            Self::Password => "password",
            Self::Username => "username",
        }
    }

    /// The config key of the client-facing presence flag.
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            Self::ApiToken => "_hasApiToken",
            Self::ApiKey => "_hasApiKey",
            Self::Password => "_hasPassword",
            Self::Username => "_hasUsername",
        }
    }

    /// Whether `fields` carries a usable value for this secret.
    ///
    /// `null` and the empty string count as absent.
    #[must_use]
    pub fn is_supplied(self, fields: &Map<String, Value>) -> bool {
        match fields.get(self.key()) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Whether `fields` sets this secret's presence flag to `true`.
    #[must_use]
    pub fn is_flagged(self, fields: &Map<String, Value>) -> bool {
        fields.get(self.flag()).and_then(Value::as_bool) == Some(true)
    }
}

/// Which half of a dual widget a path points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DualSlot {
    Top,
    Bottom,
}

impl DualSlot {
    /// Both slots, top first.
    pub const BOTH: [Self; 2] = [Self::Top, Self::Bottom];

    /// The config key holding the sub-widget.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Top => "topWidget",
            Self::Bottom => "bottomWidget",
        }
    }
}

/// Location of a secret inside an item's config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// `config.<field>`
    Config(SecretField),
    /// `config.<slot>.config.<field>`
    Dual(DualSlot, SecretField),
}

impl FieldPath {
    /// The secret field at the end of the path.
    #[must_use]
    pub fn field(self) -> SecretField {
        match self {
            Self::Config(field) | Self::Dual(_, field) => field,
        }
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(field) => write!(f, "config.{}", field.key()),
            Self::Dual(slot, field) => write!(f, "config.{}.config.{}", slot.key(), field.key()),
        }
    }
}

/// Top-level secret fields for each recognized widget type.
const REGISTRY: &[(&str, &[SecretField])] = &[
    ("pihole-widget", &[SecretField::ApiToken, SecretField::Password]),
    ("adguard-widget", &[SecretField::Username, SecretField::Password]),
    ("sonarr-widget", &[SecretField::ApiKey]),
    ("radarr-widget", &[SecretField::ApiKey]),
    ("media-server-widget", &[SecretField::ApiKey]),
    ("media-request-manager-widget", &[SecretField::ApiKey]),
    ("download-client", &[SecretField::Password]),
    ("torrent-client", &[SecretField::Password]),
];

/// Secret field paths for an item of type `kind`.
///
/// A dual widget's sub-widgets may be any secret-bearing type, so every known
/// secret field is registered under both slots. Unknown types yield an empty
/// list.
#[must_use]
pub fn secret_fields_for(kind: &str) -> Vec<FieldPath> {
    if kind == DUAL_WIDGET {
        return DualSlot::BOTH
            .into_iter()
            .flat_map(|slot| {
                SecretField::ALL
                    .into_iter()
                    .map(move |field| FieldPath::Dual(slot, field))
            })
            .collect();
    }

    REGISTRY
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, fields)| fields.iter().copied().map(FieldPath::Config).collect())
        .unwrap_or_default()
}

/// Whether `key` is a transient, communication-only config key.
#[must_use]
pub fn is_transient_key(key: &str) -> bool {
    key == DUPLICATED_FROM || key.starts_with(FLAG_PREFIX)
}

/// Remove every transient key from `fields`.
pub fn strip_transient(fields: &mut Map<String, Value>) {
    fields.retain(|key, _| !is_transient_key(key));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pihole_has_token_and_password() {
        assert_eq!(
            secret_fields_for("pihole-widget"),
            vec![
                FieldPath::Config(SecretField::ApiToken),
                FieldPath::Config(SecretField::Password),
            ]
        );
    }

    #[test]
    fn unknown_type_has_no_secrets() {
        assert!(secret_fields_for("app-shortcut").is_empty());
        assert!(secret_fields_for("").is_empty());
        assert!(secret_fields_for(GROUP_WIDGET).is_empty());
    }

    #[test]
    fn dual_widget_paths_cover_both_slots() {
        let paths = secret_fields_for(DUAL_WIDGET);
        assert_eq!(paths.len(), 8);
        assert!(paths.contains(&FieldPath::Dual(DualSlot::Top, SecretField::ApiKey)));
        assert!(paths.contains(&FieldPath::Dual(DualSlot::Bottom, SecretField::Password)));
        assert!(!paths.iter().any(|p| matches!(p, FieldPath::Config(_))));
    }

    #[test]
    fn path_display_names_the_config_location() {
        assert_eq!(
            FieldPath::Dual(DualSlot::Bottom, SecretField::ApiToken).to_string(),
            "config.bottomWidget.config.apiToken"
        );
        assert_eq!(FieldPath::Config(SecretField::ApiKey).to_string(), "config.apiKey");
    }

    #[test]
    fn empty_and_null_values_are_not_supplied() {
        let fields = json!({"apiToken": "", "password": null, "apiKey": "k"});
        let fields = fields.as_object().cloned().unwrap_or_default();
        assert!(!SecretField::ApiToken.is_supplied(&fields));
        assert!(!SecretField::Password.is_supplied(&fields));
        assert!(SecretField::ApiKey.is_supplied(&fields));
        assert!(!SecretField::Username.is_supplied(&fields));
    }

    #[test]
    fn only_literal_true_counts_as_flagged() {
        let fields = json!({"_hasApiToken": true, "_hasPassword": "true", "_hasApiKey": false});
        let fields = fields.as_object().cloned().unwrap_or_default();
        assert!(SecretField::ApiToken.is_flagged(&fields));
        assert!(!SecretField::Password.is_flagged(&fields));
        assert!(!SecretField::ApiKey.is_flagged(&fields));
    }

    #[test]
    fn strip_transient_removes_flags_and_marker_only() {
        let fields = json!({
            "_hasApiToken": true,
            "_hasCustom": true,
            "_duplicatedFrom": "a1",
            "host": "10.0.0.2",
            "apiToken": "ENC(x)"
        });
        let mut fields = fields.as_object().cloned().unwrap_or_default();
        strip_transient(&mut fields);
        assert_eq!(
            Value::Object(fields),
            json!({"host": "10.0.0.2", "apiToken": "ENC(x)"})
        );
    }
}
