//! Entity registry.
//!
//! Owns every compiled entity for the lifetime of the process. Entities are
//! immutable once registered.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity::{EntityConfig, EntityKind};
use super::error::CatalogError;
use super::field::{Field, LayoutField};
use super::index::SchemaIndex;
use super::localization::LocalizationConfig;
use super::types::FieldType;

/// Schema section of a project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    /// Localization settings; absent means localization is off.
    #[serde(default)]
    pub localization: Option<LocalizationConfig>,
    /// Collection definitions.
    #[serde(default)]
    pub collections: Vec<EntityConfig>,
    /// Global definitions.
    #[serde(default)]
    pub globals: Vec<EntityConfig>,
}

impl SchemaConfig {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable localization.
    pub fn with_localization(mut self, localization: LocalizationConfig) -> Self {
        self.localization = Some(localization);
        self
    }

    /// Add a collection.
    pub fn with_collection(mut self, entity: EntityConfig) -> Self {
        self.collections.push(entity);
        self
    }

    /// Add a global.
    pub fn with_global(mut self, entity: EntityConfig) -> Self {
        self.globals.push(entity);
        self
    }
}

/// An entity together with its path index.
#[derive(Debug, Clone)]
pub struct CompiledEntity {
    /// The entity definition.
    pub config: EntityConfig,
    /// Stored path index.
    pub index: SchemaIndex,
}

impl CompiledEntity {
    /// Entity slug.
    pub fn slug(&self) -> &str {
        &self.config.slug
    }

    /// Collection or global.
    pub fn kind(&self) -> EntityKind {
        self.config.kind
    }
}

/// Registry of compiled entities keyed by slug.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entities: HashMap<String, CompiledEntity>,
    collections: Vec<String>,
    globals: Vec<String>,
    localization: Option<LocalizationConfig>,
}

impl EntityRegistry {
    /// Compile and validate every entity of a schema.
    pub fn new(config: SchemaConfig) -> Result<Self, CatalogError> {
        if let Some(localization) = &config.localization {
            if !localization.contains(&localization.default_locale) {
                return Err(CatalogError::UnknownDefaultLocale(
                    localization.default_locale.clone(),
                ));
            }
        }

        let mut registry = Self {
            entities: HashMap::new(),
            collections: Vec::new(),
            globals: Vec::new(),
            localization: config.localization,
        };

        let entities = config
            .collections
            .into_iter()
            .map(|e| (e, EntityKind::Collection))
            .chain(config.globals.into_iter().map(|e| (e, EntityKind::Global)));

        for (mut entity, kind) in entities {
            entity.kind = kind;
            if registry.entities.contains_key(&entity.slug) {
                return Err(CatalogError::DuplicateSlug(entity.slug));
            }
            let index = SchemaIndex::build(&entity, registry.localization.as_ref());
            debug!(entity = %entity.slug, ?kind, paths = index.len(), "compiled entity");

            match kind {
                EntityKind::Collection => registry.collections.push(entity.slug.clone()),
                EntityKind::Global => registry.globals.push(entity.slug.clone()),
            }
            registry
                .entities
                .insert(entity.slug.clone(), CompiledEntity { config: entity, index });
        }

        registry.validate_relations()?;
        Ok(registry)
    }

    /// Parse a schema from JSON and compile it.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CatalogError> {
        let config: SchemaConfig = serde_json::from_value(value)
            .map_err(|e| CatalogError::InvalidSchema(e.to_string()))?;
        Self::new(config)
    }

    /// Look up an entity by slug.
    pub fn lookup(&self, slug: &str) -> Option<&CompiledEntity> {
        self.entities.get(slug)
    }

    /// Collection entities, in definition order.
    pub fn collections(&self) -> impl Iterator<Item = &CompiledEntity> {
        self.collections.iter().filter_map(|s| self.entities.get(s))
    }

    /// Global entities, in definition order.
    pub fn globals(&self) -> impl Iterator<Item = &CompiledEntity> {
        self.globals.iter().filter_map(|s| self.entities.get(s))
    }

    /// Localization settings, if enabled.
    pub fn localization(&self) -> Option<&LocalizationConfig> {
        self.localization.as_ref()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn validate_relations(&self) -> Result<(), CatalogError> {
        for entity in self.entities.values() {
            let mut targets = Vec::new();
            collect_targets(&entity.config.fields, None, &mut targets);
            for (field, target) in targets {
                let known = self
                    .entities
                    .get(&target)
                    .is_some_and(|e| e.kind() == EntityKind::Collection);
                if !known {
                    return Err(CatalogError::UnknownRelationTarget {
                        entity: entity.config.slug.clone(),
                        field,
                        target,
                    });
                }
            }
        }
        Ok(())
    }
}

fn collect_targets(fields: &[Field], prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    for field in fields {
        match field {
            Field::Layout(LayoutField::Row { fields })
            | Field::Layout(LayoutField::Collapsible { fields }) => {
                collect_targets(fields, prefix, out)
            }
            Field::Layout(LayoutField::Tabs { tabs }) => {
                for tab in tabs {
                    match &tab.name {
                        Some(name) => {
                            let path = join(prefix, name);
                            collect_targets(&tab.fields, Some(&path), out);
                        }
                        None => collect_targets(&tab.fields, prefix, out),
                    }
                }
            }
            Field::Data(def) => {
                let path = join(prefix, &def.name);
                match &def.field_type {
                    FieldType::Relationship { relation_to, .. } => {
                        for slug in relation_to.slugs() {
                            out.push((path.clone(), slug.to_string()));
                        }
                    }
                    FieldType::Upload { relation_to } => {
                        out.push((path, relation_to.clone()));
                    }
                    FieldType::Group { fields } | FieldType::Array { fields } => {
                        collect_targets(fields, Some(&path), out);
                    }
                    FieldType::Blocks { blocks } => {
                        for block in blocks {
                            collect_targets(&block.fields, Some(&path), out);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

fn join(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{name}"),
        None => name.to_string(),
    }
}
