//! Field definitions for entities.

use serde::{Deserialize, Serialize};

use super::types::{Block, FieldType, RelationTo, Tab};

/// A field as configured on an entity.
///
/// Data fields store values under their own name. Layout fields only group
/// other fields for presentation and never appear in stored paths, except
/// named tabs which behave like groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    /// Presentational container.
    Layout(LayoutField),
    /// Named field that stores data.
    Data(FieldDef),
}

/// Presentational containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutField {
    /// Fields laid out side by side.
    Row { fields: Vec<Field> },
    /// Fields inside a collapsible panel.
    Collapsible { fields: Vec<Field> },
    /// Tabbed fields.
    Tabs { tabs: Vec<Tab> },
}

/// A data field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether one value is stored per locale.
    #[serde(default)]
    pub localized: bool,
    /// Hidden fields never leave the data layer unless explicitly requested.
    #[serde(default)]
    pub hidden: bool,
    /// Whether the field should be indexed.
    #[serde(default)]
    pub index: bool,
    /// Whether values must be unique.
    #[serde(default)]
    pub unique: bool,
}

impl FieldDef {
    /// Create a new field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            localized: false,
            hidden: false,
            index: false,
            unique: false,
        }
    }

    /// Create a text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Create a number field.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Create a checkbox field.
    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Checkbox)
    }

    /// Create a date field.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    /// Create a geo point field.
    pub fn point(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Point)
    }

    /// Create a single-valued select field.
    pub fn select(name: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            name,
            FieldType::Select {
                options: options.iter().map(|o| o.to_string()).collect(),
                has_many: false,
            },
        )
    }

    /// Create a relationship to a single collection.
    pub fn relationship(name: impl Into<String>, relation_to: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldType::Relationship {
                relation_to: RelationTo::One(relation_to.into()),
                has_many: false,
            },
        )
    }

    /// Create a relationship whose target varies per stored value.
    pub fn polymorphic(name: impl Into<String>, relation_to: &[&str]) -> Self {
        Self::new(
            name,
            FieldType::Relationship {
                relation_to: RelationTo::Many(relation_to.iter().map(|s| s.to_string()).collect()),
                has_many: false,
            },
        )
    }

    /// Create an upload field (a relationship to a media collection).
    pub fn upload(name: impl Into<String>, relation_to: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldType::Upload {
                relation_to: relation_to.into(),
            },
        )
    }

    /// Create a group field.
    pub fn group(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::new(name, FieldType::Group { fields })
    }

    /// Create an array field.
    pub fn array(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::new(name, FieldType::Array { fields })
    }

    /// Create a blocks field.
    pub fn blocks(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self::new(name, FieldType::Blocks { blocks })
    }

    /// Store one value per locale.
    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    /// Mark as hidden.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Mark as indexed.
    pub fn with_index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Mark as unique (implies an index).
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.index = true;
        self
    }

    /// Allow multiple values (selects and relationships only).
    pub fn has_many(mut self) -> Self {
        match &mut self.field_type {
            FieldType::Select { has_many, .. } | FieldType::Relationship { has_many, .. } => {
                *has_many = true;
            }
            _ => {}
        }
        self
    }
}

impl From<FieldDef> for Field {
    fn from(def: FieldDef) -> Self {
        Field::Data(def)
    }
}

impl From<LayoutField> for Field {
    fn from(layout: LayoutField) -> Self {
        Field::Layout(layout)
    }
}

impl Field {
    /// Create a row of fields.
    pub fn row(fields: Vec<Field>) -> Self {
        Field::Layout(LayoutField::Row { fields })
    }

    /// Create a collapsible panel of fields.
    pub fn collapsible(fields: Vec<Field>) -> Self {
        Field::Layout(LayoutField::Collapsible { fields })
    }

    /// Create a tabs field.
    pub fn tabs(tabs: Vec<Tab>) -> Self {
        Field::Layout(LayoutField::Tabs { tabs })
    }

    /// The data definition, if this field stores data.
    pub fn as_data(&self) -> Option<&FieldDef> {
        match self {
            Field::Data(def) => Some(def),
            Field::Layout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::text("title").localized().unique();
        assert_eq!(field.name, "title");
        assert!(field.localized);
        assert!(field.unique);
        assert!(field.index);
        assert!(!field.hidden);
    }

    #[test]
    fn test_has_many_only_applies_to_lists() {
        let tags = FieldDef::select("tags", &["a", "b"]).has_many();
        assert!(matches!(tags.field_type, FieldType::Select { has_many: true, .. }));

        let title = FieldDef::text("title").has_many();
        assert_eq!(title.field_type, FieldType::Text);
    }

    #[test]
    fn test_deserialize_data_and_layout() {
        let fields: Vec<Field> = serde_json::from_value(json!([
            { "name": "title", "type": "text", "localized": true },
            { "type": "row", "fields": [{ "name": "views", "type": "number" }] },
            { "name": "author", "type": "relationship", "relationTo": "users" }
        ]))
        .unwrap();

        assert_eq!(fields[0], FieldDef::text("title").localized().into());
        assert!(matches!(fields[1], Field::Layout(LayoutField::Row { .. })));
        assert_eq!(fields[2], FieldDef::relationship("author", "users").into());
    }
}
