//! Entity definitions.

use serde::{Deserialize, Serialize};

use super::field::{Field, FieldDef};
use super::types::FieldType;

/// Whether an entity is a collection of documents or a single global document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Many documents.
    #[default]
    Collection,
    /// Exactly one document.
    Global,
}

/// How the stored `_id` is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdType {
    /// Store-generated 24-hex object identifiers.
    ObjectId,
    /// Custom text identifiers.
    Text,
    /// Custom numeric identifiers.
    Number,
}

/// An entity definition (collection or global).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Entity slug (unique across collections and globals).
    pub slug: String,
    /// Collection or global. Set by the registry from the list it came from.
    #[serde(default)]
    pub kind: EntityKind,
    /// Field definitions.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Maintain `createdAt` / `updatedAt`.
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
    /// Auth-enabled collections carry credential fields.
    #[serde(default)]
    pub auth: bool,
}

fn default_timestamps() -> bool {
    true
}

impl EntityConfig {
    /// Create a new collection.
    pub fn collection(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            kind: EntityKind::Collection,
            fields: Vec::new(),
            timestamps: true,
            auth: false,
        }
    }

    /// Create a new global.
    pub fn global(slug: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Global,
            ..Self::collection(slug)
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: impl Into<Field>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Disable timestamps.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Enable auth fields.
    pub fn with_auth(mut self) -> Self {
        self.auth = true;
        self
    }

    /// Get a top-level data field by name (layout containers are searched through).
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        find_field(&self.fields, name)
    }

    /// Identifier representation. A top-level `id` data field makes the
    /// identifier custom: numeric if it is a number field, text otherwise.
    pub fn id_type(&self) -> IdType {
        match self.get_field("id") {
            Some(def) if def.field_type == FieldType::Number => IdType::Number,
            Some(_) => IdType::Text,
            None => IdType::ObjectId,
        }
    }

    /// Whether the identifier is supplied by the application.
    pub fn has_custom_id(&self) -> bool {
        self.id_type() != IdType::ObjectId
    }

    /// Fields added implicitly: credentials for auth collections.
    pub fn implicit_fields(&self) -> Vec<FieldDef> {
        if !self.auth {
            return Vec::new();
        }
        vec![
            FieldDef::new("email", FieldType::Email).unique(),
            FieldDef::text("resetPasswordToken").hidden(),
            FieldDef::date("resetPasswordExpiration").hidden(),
            FieldDef::text("salt").hidden(),
            FieldDef::text("hash").hidden(),
            FieldDef::number("loginAttempts").hidden(),
            FieldDef::date("lockUntil").hidden(),
        ]
    }
}

fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a FieldDef> {
    use super::field::LayoutField;

    for field in fields {
        match field {
            Field::Data(def) if def.name == name => return Some(def),
            Field::Data(_) => {}
            Field::Layout(LayoutField::Row { fields })
            | Field::Layout(LayoutField::Collapsible { fields }) => {
                if let Some(def) = find_field(fields, name) {
                    return Some(def);
                }
            }
            Field::Layout(LayoutField::Tabs { tabs }) => {
                for tab in tabs.iter().filter(|t| t.name.is_none()) {
                    if let Some(def) = find_field(&tab.fields, name) {
                        return Some(def);
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::Tab;

    #[test]
    fn test_entity_builder() {
        let posts = EntityConfig::collection("posts")
            .with_field(FieldDef::text("title"))
            .with_field(FieldDef::number("views"));

        assert_eq!(posts.slug, "posts");
        assert_eq!(posts.kind, EntityKind::Collection);
        assert!(posts.timestamps);
        assert_eq!(posts.fields.len(), 2);
        assert!(posts.get_field("views").is_some());
        assert!(posts.get_field("missing").is_none());
    }

    #[test]
    fn test_get_field_through_layout() {
        let entity = EntityConfig::collection("pages").with_field(Field::tabs(vec![Tab {
            name: None,
            localized: false,
            fields: vec![Field::row(vec![FieldDef::text("slug").into()])],
        }]));
        assert!(entity.get_field("slug").is_some());
    }

    #[test]
    fn test_id_type() {
        assert_eq!(EntityConfig::collection("a").id_type(), IdType::ObjectId);

        let numeric = EntityConfig::collection("b").with_field(FieldDef::number("id"));
        assert_eq!(numeric.id_type(), IdType::Number);
        assert!(numeric.has_custom_id());

        let text = EntityConfig::collection("c").with_field(FieldDef::text("id"));
        assert_eq!(text.id_type(), IdType::Text);
    }

    #[test]
    fn test_auth_fields() {
        let users = EntityConfig::collection("users").with_auth();
        let implicit = users.implicit_fields();
        let salt = implicit.iter().find(|f| f.name == "salt").unwrap();
        assert!(salt.hidden);
        assert!(implicit.iter().any(|f| f.name == "email" && !f.hidden));

        assert!(EntityConfig::collection("posts").implicit_fields().is_empty());
    }

    #[test]
    fn test_global() {
        let settings = EntityConfig::global("settings");
        assert_eq!(settings.kind, EntityKind::Global);
    }
}
