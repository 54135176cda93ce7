//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Operator name outside the supported set.
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// Sort string could not be interpreted.
    #[error("invalid sort: {0}")]
    InvalidSort(String),

    /// Filter document had an unexpected shape.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}
