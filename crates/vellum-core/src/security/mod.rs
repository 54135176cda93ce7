//! Field-level read security.
//!
//! - [`RequestContext`] - caller identity and locale
//! - [`PolicyService`] - computes [`FieldReadPermission`]s, with
//!   [`RuleBasedPolicy`] as the built-in implementation
//! - [`AccessPolicyCache`] - per-compile memoization of permissions

mod cache;
mod context;
mod error;
mod permission;
mod policy;

pub use cache::AccessPolicyCache;
pub use context::RequestContext;
pub use error::{PolicyError, PolicyResult};
pub use permission::FieldReadPermission;
pub use policy::{EntityRules, FieldAccess, PolicyOperation, PolicyService, RuleBasedPolicy};
