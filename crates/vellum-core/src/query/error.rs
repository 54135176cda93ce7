//! Query compilation errors.

use thiserror::Error;

use crate::security::PolicyError;
use crate::store::StoreError;

/// Errors raised while compiling a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The path does not exist or the caller may not read it. Both cases
    /// render identically.
    #[error("unknown property in query: \"{0}\"")]
    UnknownOrForbiddenPath(String),

    /// Operator outside the supported set.
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// The policy service failed for an entity.
    #[error("failed to compute read access for {entity}: {source}")]
    PolicyComputation {
        entity: String,
        #[source]
        source: PolicyError,
    },

    /// A relationship sub-query failed.
    #[error("relationship sub-query against {entity} failed: {source}")]
    RelationshipSubquery {
        entity: String,
        #[source]
        source: StoreError,
    },

    /// The entity is not registered.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

/// Result type for query compilation.
pub type QueryResult<T> = Result<T, QueryError>;
