//! Document store seam.
//!
//! The compiler only needs `find` to collect identifiers for relationship
//! sub-queries. [`MemoryStore`] evaluates native queries over JSON documents.

mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use vellum_proto::NativeQuery;

pub use memory::MemoryStore;

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl FindOptions {
    /// Limit the result size.
    pub fn limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

/// Document store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The collection does not exist in the store.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A `$regex` pattern could not be compiled.
    #[error("invalid regex {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// The store cannot evaluate an operator.
    #[error("unsupported operator: {0}")]
    Unsupported(String),

    /// Backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to stored documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents of `entity` matching `query`.
    async fn find(
        &self,
        entity: &str,
        query: &NativeQuery,
        options: FindOptions,
    ) -> StoreResult<Vec<Value>>;
}
