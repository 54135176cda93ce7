//! Schema path index.
//!
//! Read-only introspection over an entity's stored layout. Every stored path
//! an entity can be filtered or sorted on is recorded together with its kind
//! and the policy key used to look up read permission. Localized fields are
//! recorded twice: once unqualified (flagged `localized`) and once per locale.

use std::collections::{BTreeSet, HashMap};

use super::entity::{EntityConfig, IdType};
use super::field::{Field, FieldDef, LayoutField};
use super::localization::LocalizationConfig;
use super::types::{FieldType, RelationTo};

/// Identifier path present on every entity.
pub const ID_PATH: &str = "_id";

/// Stored value kinds for leaf paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// The document identifier.
    Id(IdType),
    Text,
    Number,
    Checkbox,
    Date,
    Point,
    Json,
    Select,
    /// A stored reference to a document in another collection.
    Reference,
}

/// Where a relationship path leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTarget {
    /// One known collection.
    Fixed(String),
    /// Target recorded per value in `<path>.relationTo`.
    Polymorphic(Vec<String>),
}

impl RelationTarget {
    /// Candidate target slugs.
    pub fn slugs(&self) -> Vec<&str> {
        match self {
            RelationTarget::Fixed(slug) => vec![slug.as_str()],
            RelationTarget::Polymorphic(slugs) => slugs.iter().map(String::as_str).collect(),
        }
    }
}

/// Kind of an indexed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// A stored scalar.
    Leaf(LeafKind),
    /// A prefix of deeper stored paths.
    Nested,
    /// A reference into other entities.
    Relation {
        /// Target collection(s).
        target: RelationTarget,
        /// Whether several references are stored.
        has_many: bool,
    },
}

/// Metadata recorded for an indexed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Path kind.
    pub kind: PathKind,
    /// Unqualified path of a localized field (locale segment still missing).
    pub localized: bool,
    /// Hidden field (or inside a hidden container).
    pub hidden: bool,
    /// Field path with locale segments removed; permission lookup key.
    pub policy_key: String,
}

/// Storage-level path type, as document stores report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// A stored path.
    Real,
    /// Only a prefix of stored paths.
    Nested,
    /// Not part of the schema.
    AdhocOrUndefined,
}

/// Classification of a path against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass<'a> {
    /// A stored scalar.
    Leaf {
        /// Path metadata.
        info: &'a PathInfo,
        /// Value kind.
        kind: LeafKind,
    },
    /// Prefix of deeper paths.
    Nested {
        /// Path metadata.
        info: &'a PathInfo,
    },
    /// Relationship into other entities.
    Relation {
        /// Path metadata.
        info: &'a PathInfo,
        /// Target collection(s).
        target: &'a RelationTarget,
    },
    /// Not in the schema.
    Unknown,
}

impl PathClass<'_> {
    /// Metadata for known paths.
    pub fn info(&self) -> Option<&PathInfo> {
        match self {
            PathClass::Leaf { info, .. }
            | PathClass::Nested { info }
            | PathClass::Relation { info, .. } => Some(info),
            PathClass::Unknown => None,
        }
    }
}

/// Path index for one entity.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    paths: HashMap<String, PathInfo>,
    id_type: IdType,
    timestamps: bool,
}

impl SchemaIndex {
    /// Build the index for an entity.
    pub fn build(entity: &EntityConfig, localization: Option<&LocalizationConfig>) -> Self {
        let locales = localization.map(|l| l.locales.as_slice()).unwrap_or_default();
        let id_type = entity.id_type();
        let mut builder = IndexBuilder {
            locales,
            paths: HashMap::new(),
        };

        builder.insert(
            ID_PATH.to_string(),
            PathInfo {
                kind: PathKind::Leaf(LeafKind::Id(id_type)),
                localized: false,
                hidden: false,
                policy_key: "id".to_string(),
            },
        );

        let root = Scope::default();
        for field in &entity.fields {
            // A custom `id` field is stored as `_id`.
            if matches!(field, Field::Data(def) if def.name == "id") {
                continue;
            }
            builder.add_field(field, &root);
        }
        for def in entity.implicit_fields() {
            builder.add_data(&def, &root);
        }
        if entity.timestamps {
            builder.add_data(&FieldDef::date("createdAt"), &root);
            builder.add_data(&FieldDef::date("updatedAt"), &root);
        }

        Self {
            paths: builder.paths,
            id_type,
            timestamps: entity.timestamps,
        }
    }

    /// Look up a path.
    pub fn get(&self, path: &str) -> Option<&PathInfo> {
        self.paths.get(path)
    }

    /// Check whether a path is indexed.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Classify a path.
    pub fn classify(&self, path: &str) -> PathClass<'_> {
        match self.paths.get(path) {
            Some(info) => match &info.kind {
                PathKind::Leaf(kind) => PathClass::Leaf { info, kind: *kind },
                PathKind::Nested => PathClass::Nested { info },
                PathKind::Relation { target, .. } => PathClass::Relation { info, target },
            },
            None => PathClass::Unknown,
        }
    }

    /// Storage-level path type.
    pub fn path_type(&self, path: &str) -> PathType {
        match self.paths.get(path).map(|info| &info.kind) {
            Some(PathKind::Nested) => PathType::Nested,
            Some(_) => PathType::Real,
            None => PathType::AdhocOrUndefined,
        }
    }

    /// Identifier representation.
    pub fn id_type(&self) -> IdType {
        self.id_type
    }

    /// Whether `createdAt` / `updatedAt` are maintained.
    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Every distinct policy key, sorted.
    pub fn policy_keys(&self) -> BTreeSet<&str> {
        self.paths
            .values()
            .map(|info| info.policy_key.as_str())
            .collect()
    }

    /// Number of indexed paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the index is empty (never true for built indexes).
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    path: Option<String>,
    key: Option<String>,
    hidden: bool,
}

impl Scope {
    fn child(&self, path: String, key: String, hidden: bool) -> Self {
        Self {
            path: Some(path),
            key: Some(key),
            hidden: self.hidden || hidden,
        }
    }
}

fn join(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{name}"),
        None => name.to_string(),
    }
}

struct IndexBuilder<'a> {
    locales: &'a [String],
    paths: HashMap<String, PathInfo>,
}

impl IndexBuilder<'_> {
    fn insert(&mut self, path: String, info: PathInfo) {
        // The first definition of a path wins (blocks may repeat field names).
        self.paths.entry(path).or_insert(info);
    }

    /// Insert a path and its per-locale copies; returns the stored bases
    /// under which children live.
    fn insert_localized(
        &mut self,
        path: String,
        key: &str,
        kind: PathKind,
        localized: bool,
        hidden: bool,
    ) -> Vec<String> {
        let localized = localized && !self.locales.is_empty();
        self.insert(
            path.clone(),
            PathInfo {
                kind: kind.clone(),
                localized,
                hidden,
                policy_key: key.to_string(),
            },
        );

        if !localized {
            return vec![path];
        }

        let mut bases = Vec::with_capacity(self.locales.len());
        for locale in self.locales {
            let localized_path = format!("{path}.{locale}");
            self.insert(
                localized_path.clone(),
                PathInfo {
                    kind: kind.clone(),
                    localized: false,
                    hidden,
                    policy_key: key.to_string(),
                },
            );
            bases.push(localized_path);
        }
        bases
    }

    fn add_fields(&mut self, fields: &[Field], scope: &Scope) {
        for field in fields {
            self.add_field(field, scope);
        }
    }

    fn add_field(&mut self, field: &Field, scope: &Scope) {
        match field {
            Field::Data(def) => self.add_data(def, scope),
            Field::Layout(LayoutField::Row { fields })
            | Field::Layout(LayoutField::Collapsible { fields }) => self.add_fields(fields, scope),
            Field::Layout(LayoutField::Tabs { tabs }) => {
                for tab in tabs {
                    match &tab.name {
                        Some(name) => {
                            let path = join(scope.path.as_deref(), name);
                            let key = join(scope.key.as_deref(), name);
                            let bases = self.insert_localized(
                                path,
                                &key,
                                PathKind::Nested,
                                tab.localized,
                                scope.hidden,
                            );
                            for base in bases {
                                let child = scope.child(base, key.clone(), false);
                                self.add_fields(&tab.fields, &child);
                            }
                        }
                        None => self.add_fields(&tab.fields, scope),
                    }
                }
            }
        }
    }

    fn add_data(&mut self, def: &FieldDef, scope: &Scope) {
        let path = join(scope.path.as_deref(), &def.name);
        let key = join(scope.key.as_deref(), &def.name);
        let hidden = scope.hidden || def.hidden;

        match &def.field_type {
            FieldType::Group { fields } | FieldType::Array { fields } => {
                let bases =
                    self.insert_localized(path, &key, PathKind::Nested, def.localized, hidden);
                for base in bases {
                    let child = scope.child(base, key.clone(), def.hidden);
                    self.add_fields(fields, &child);
                }
            }
            FieldType::Blocks { blocks } => {
                let bases =
                    self.insert_localized(path, &key, PathKind::Nested, def.localized, hidden);
                for base in bases {
                    self.insert(
                        format!("{base}.blockType"),
                        PathInfo {
                            kind: PathKind::Leaf(LeafKind::Text),
                            localized: false,
                            hidden,
                            policy_key: key.clone(),
                        },
                    );
                    let child = scope.child(base, key.clone(), def.hidden);
                    for block in blocks {
                        self.add_fields(&block.fields, &child);
                    }
                }
            }
            FieldType::Relationship {
                relation_to,
                has_many,
            } => {
                let target = match relation_to {
                    RelationTo::One(slug) => RelationTarget::Fixed(slug.clone()),
                    RelationTo::Many(slugs) => RelationTarget::Polymorphic(slugs.clone()),
                };
                let polymorphic = relation_to.is_polymorphic();
                let kind = PathKind::Relation {
                    target,
                    has_many: *has_many,
                };
                let bases = self.insert_localized(path, &key, kind, def.localized, hidden);
                if polymorphic {
                    for base in bases {
                        self.add_polymorphic_columns(&base, &key, hidden);
                    }
                }
            }
            FieldType::Upload { relation_to } => {
                let kind = PathKind::Relation {
                    target: RelationTarget::Fixed(relation_to.clone()),
                    has_many: false,
                };
                self.insert_localized(path, &key, kind, def.localized, hidden);
            }
            scalar => {
                let kind = PathKind::Leaf(leaf_kind(scalar));
                self.insert_localized(path, &key, kind, def.localized, hidden);
            }
        }
    }

    fn add_polymorphic_columns(&mut self, base: &str, key: &str, hidden: bool) {
        self.insert(
            format!("{base}.value"),
            PathInfo {
                kind: PathKind::Leaf(LeafKind::Reference),
                localized: false,
                hidden,
                policy_key: key.to_string(),
            },
        );
        self.insert(
            format!("{base}.relationTo"),
            PathInfo {
                kind: PathKind::Leaf(LeafKind::Text),
                localized: false,
                hidden,
                policy_key: key.to_string(),
            },
        );
    }
}

fn leaf_kind(field_type: &FieldType) -> LeafKind {
    match field_type {
        FieldType::Number => LeafKind::Number,
        FieldType::Checkbox => LeafKind::Checkbox,
        FieldType::Date => LeafKind::Date,
        FieldType::Point => LeafKind::Point,
        FieldType::RichText | FieldType::Json => LeafKind::Json,
        FieldType::Radio { .. } | FieldType::Select { .. } => LeafKind::Select,
        FieldType::Relationship { .. } | FieldType::Upload { .. } => LeafKind::Reference,
        _ => LeafKind::Text,
    }
}
