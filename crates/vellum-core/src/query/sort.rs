//! Sort resolution.
//!
//! A requested sort is honored only on stored fields the caller can read.
//! Anything else falls back to the entity's default order instead of failing.

use serde_json::Value;
use tracing::debug;
use vellum_proto::SortSpec;

use super::error::{QueryError, QueryResult};
use super::resolver::{localize_path, sanitize_path};
use crate::catalog::{CompiledEntity, PathClass, ID_PATH};
use crate::security::AccessPolicyCache;

/// Outcome of sort resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sort {
    /// No sort was requested; the entity's default order applies.
    Default(SortSpec),
    /// The requested sort is allowed.
    Explicit(SortSpec),
    /// The requested sort was refused; the default order applies.
    Disabled {
        /// Sort as requested by the caller.
        requested: String,
        /// Order used instead.
        fallback: SortSpec,
    },
}

impl Sort {
    /// The order to apply.
    pub fn spec(&self) -> &SortSpec {
        match self {
            Sort::Default(spec) | Sort::Explicit(spec) => spec,
            Sort::Disabled { fallback, .. } => fallback,
        }
    }

    /// Whether the requested sort was refused.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Sort::Disabled { .. })
    }

    /// Render the order to apply as a native sort document.
    pub fn to_json(&self) -> Value {
        self.spec().to_json()
    }
}

/// Default order: newest first by `createdAt`, or by identifier without
/// timestamps.
pub fn default_sort(entity: &CompiledEntity) -> SortSpec {
    if entity.index.has_timestamps() {
        SortSpec::desc("createdAt")
    } else {
        SortSpec::desc(ID_PATH)
    }
}

/// Resolve a requested sort (`field` or `-field`) for an entity.
///
/// Hidden fields are never sortable, not even with `override_access`.
pub async fn resolve_sort(
    entity: &CompiledEntity,
    requested: Option<&str>,
    cache: &AccessPolicyCache,
    locale: Option<&str>,
    override_access: bool,
) -> QueryResult<Sort> {
    let fallback = default_sort(entity);
    let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Sort::Default(fallback));
    };

    let disabled = |reason: &str| {
        debug!(entity = entity.slug(), requested, reason, "sort disabled");
        Sort::Disabled {
            requested: requested.to_string(),
            fallback: fallback.clone(),
        }
    };

    let (property, order) = SortSpec::parse_requested(requested);
    let property = sanitize_path(property);
    let segments: Vec<&str> = property.split('.').collect();
    let index = &entity.index;

    // Walk the path, qualifying every localized segment on the way down.
    let mut path = String::new();
    let mut resolved = None;
    for (i, segment) in segments.iter().enumerate() {
        let current = if path.is_empty() {
            segment.to_string()
        } else {
            format!("{path}.{segment}")
        };
        let next = segments.get(i + 1).copied();

        match index.classify(&current) {
            PathClass::Unknown => return Ok(disabled("unknown")),
            PathClass::Nested { info } => {
                if next.is_none() {
                    return Ok(disabled("container"));
                }
                path = localize_path(index, current, info, next, locale, false);
            }
            PathClass::Leaf { info, .. } | PathClass::Relation { info, .. } => {
                if let Some(next) = next {
                    // Explicit locale or a stored sub-column.
                    if index.contains(&format!("{current}.{next}")) {
                        path = current;
                        continue;
                    }
                    return Ok(disabled("below a field"));
                }
                resolved = Some((localize_path(index, current, info, None, locale, false), info));
            }
        }
    }
    let Some((property, info)) = resolved else {
        return Ok(disabled("unknown"));
    };

    if info.hidden {
        return Ok(disabled("hidden"));
    }

    if !override_access && info.policy_key != "id" {
        let permission = cache
            .ensure(entity)
            .await
            .map_err(|source| QueryError::PolicyComputation {
                entity: entity.slug().to_string(),
                source,
            })?;
        if !permission.can_read(&info.policy_key) {
            return Ok(disabled("unreadable"));
        }
    }

    Ok(Sort::Explicit(SortSpec { property, order }))
}
