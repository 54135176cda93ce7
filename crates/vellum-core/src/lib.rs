//! vellum core - policy-aware query compilation for a CMS data layer.
//!
//! Client `where` trees are compiled into native document-store filters:
//!
//! - [`catalog`] - entity schemas, flattened into per-entity path indexes
//! - [`security`] - request context, read policies and the per-call cache
//! - [`query`] - path resolution, relationship folding, sort resolution
//! - [`store`] - the document store seam and an in-memory backend

pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod security;
pub mod store;

pub use catalog::{
    CatalogError, CompiledEntity, EntityConfig, EntityKind, EntityRegistry, Field, FieldDef,
    FieldType, IdType, LocalizationConfig, SchemaConfig, SchemaIndex,
};
pub use config::{CompileOptions, CompilerConfig, DEFAULT_SAMPLE_CAP};
pub use error::{Error, Result};
pub use query::{CompiledQuery, QueryCompiler, QueryEngine, QueryError, QueryResult, Sort};
pub use security::{
    AccessPolicyCache, FieldAccess, FieldReadPermission, PolicyError, PolicyService,
    RequestContext, RuleBasedPolicy,
};
pub use store::{DocumentStore, FindOptions, MemoryStore, StoreError};

/// Re-export protocol types.
pub use vellum_proto as proto;
