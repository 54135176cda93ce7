//! Query compilation.
//!
//! Client filter trees are compiled here into native filter documents:
//! paths are resolved against the schema index, checked against the
//! caller's read permissions, and conditions that cross relationships are
//! folded into identifier constraints through sub-queries.

mod compiler;
mod engine;
mod error;
mod folder;
mod operator;
mod resolver;
mod sort;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use engine::QueryEngine;
pub use error::{QueryError, QueryResult};
pub use folder::RelationshipFolder;
pub use operator::{is_object_id, native_op, translate, ValueKind};
pub use resolver::{
    sanitize_path, PathResolution, PathResolver, PathSegmentResolution, PolymorphicBranch,
    Terminal,
};
pub use sort::{default_sort, resolve_sort, Sort};
