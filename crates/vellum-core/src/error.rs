//! Core error types.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::query::QueryError;
use crate::security::PolicyError;
use crate::store::StoreError;

/// Errors surfaced by the vellum core.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema registration failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Query compilation failed.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Access policy evaluation failed.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] vellum_proto::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
