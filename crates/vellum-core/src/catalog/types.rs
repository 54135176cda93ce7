//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};

use super::field::Field;

/// Target entity (or entities) of a relationship field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationTo {
    /// A single fixed target collection.
    One(String),
    /// Several candidate targets; each stored value records which one it points at.
    Many(Vec<String>),
}

impl RelationTo {
    /// All candidate target slugs.
    pub fn slugs(&self) -> Vec<&str> {
        match self {
            RelationTo::One(slug) => vec![slug.as_str()],
            RelationTo::Many(slugs) => slugs.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the target is only known per stored value.
    pub fn is_polymorphic(&self) -> bool {
        matches!(self, RelationTo::Many(_))
    }
}

/// A block definition inside a blocks field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block type slug, stored as `blockType` on each row.
    pub slug: String,
    /// Fields of this block.
    pub fields: Vec<Field>,
}

/// A tab inside a tabs field. Named tabs store their fields under the tab
/// name; unnamed tabs are presentational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    /// Tab name, if the tab stores data under its own key.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether a named tab stores one copy per locale.
    #[serde(default)]
    pub localized: bool,
    /// Tab fields.
    pub fields: Vec<Field>,
}

/// Data field types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Email,
    Textarea,
    Code,
    RichText,
    Json,
    Number,
    Checkbox,
    Date,
    Point,
    Radio {
        #[serde(default)]
        options: Vec<String>,
    },
    Select {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default, rename = "hasMany")]
        has_many: bool,
    },
    Relationship {
        #[serde(rename = "relationTo")]
        relation_to: RelationTo,
        #[serde(default, rename = "hasMany")]
        has_many: bool,
    },
    Upload {
        #[serde(rename = "relationTo")]
        relation_to: String,
    },
    Group {
        fields: Vec<Field>,
    },
    Array {
        fields: Vec<Field>,
    },
    Blocks {
        blocks: Vec<Block>,
    },
}

impl FieldType {
    /// Check if this type holds nested fields rather than a value.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            FieldType::Group { .. } | FieldType::Array { .. } | FieldType::Blocks { .. }
        )
    }

    /// Check if this type references documents in other collections.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            FieldType::Relationship { .. } | FieldType::Upload { .. }
        )
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number)
    }
}
