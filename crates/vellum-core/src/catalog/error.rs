//! Catalog error types.

use thiserror::Error;

/// Errors raised while compiling entity definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Two entities share a slug.
    #[error("duplicate entity slug: {0}")]
    DuplicateSlug(String),

    /// A relationship points at a collection that is not defined.
    #[error("field {field} on {entity} relates to unknown collection {target}")]
    UnknownRelationTarget {
        entity: String,
        field: String,
        target: String,
    },

    /// The default locale is not one of the configured locales.
    #[error("default locale {0} is not a configured locale")]
    UnknownDefaultLocale(String),

    /// The schema could not be parsed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}
