//! Entity catalog.
//!
//! Field definitions, entities, localization settings, the schema path index
//! built from them, and the registry that owns the compiled result.

mod entity;
mod error;
mod field;
mod index;
mod localization;
mod registry;
mod types;

pub use entity::{EntityConfig, EntityKind, IdType};
pub use error::CatalogError;
pub use field::{Field, FieldDef, LayoutField};
pub use index::{
    LeafKind, PathClass, PathInfo, PathKind, PathType, RelationTarget, SchemaIndex, ID_PATH,
};
pub use localization::LocalizationConfig;
pub use registry::{CompiledEntity, EntityRegistry, SchemaConfig};
pub use types::{Block, FieldType, RelationTo, Tab};
