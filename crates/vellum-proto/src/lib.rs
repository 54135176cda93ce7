//! vellum protocol types.
//!
//! This crate defines the values exchanged between the transport layer and
//! the query compiler:
//!
//! - [`filter`] - client `where` trees and their permissive parser
//! - [`operator`] - the supported client operators
//! - [`native`] - native filter documents emitted by the compiler
//! - [`sort`] - sort specifications
//! - [`error`] - protocol error types

pub mod error;
pub mod filter;
pub mod native;
pub mod operator;
pub mod sort;

pub use error::Error;
pub use filter::{Clause, FilterNode};
pub use native::{Comparison, NativeOp, NativeQuery};
pub use operator::Operator;
pub use sort::{SortOrder, SortSpec};
