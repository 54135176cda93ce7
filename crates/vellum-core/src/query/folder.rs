//! Relationship query folding.
//!
//! A condition on a path that crosses relationships is turned into a
//! constraint on the queried entity by running sub-queries from the deepest
//! entity upward: each step collects a bounded sample of matching document
//! identifiers and constrains the next shallower relation field to them.
//! Sub-queries run without permission checks; the path was already checked
//! during resolution and only identifiers are read.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use vellum_proto::{Comparison, NativeOp, NativeQuery, Operator};

use super::error::{QueryError, QueryResult};
use super::operator::translate;
use super::resolver::{PathResolution, PolymorphicBranch};
use crate::store::{DocumentStore, FindOptions};

/// Folds resolved paths into native constraints.
pub struct RelationshipFolder<'a> {
    store: &'a dyn DocumentStore,
    sample_cap: usize,
    truncated: AtomicBool,
}

impl<'a> RelationshipFolder<'a> {
    /// Create a folder sampling at most `sample_cap` identifiers per sub-query.
    pub fn new(store: &'a dyn DocumentStore, sample_cap: usize) -> Self {
        Self {
            store,
            sample_cap,
            truncated: AtomicBool::new(false),
        }
    }

    /// Whether any sub-query matched more documents than the sample cap.
    pub fn truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }

    /// Build the constraint for `operator value` on a resolved path, expressed
    /// on the queried entity. Returns `None` when the condition is dropped.
    pub fn fold<'b>(
        &'b self,
        resolution: &'b PathResolution,
        operator: Operator,
        value: &'b Value,
    ) -> BoxFuture<'b, QueryResult<Option<NativeQuery>>> {
        async move {
            let last = resolution.segments.len() - 1;
            let deepest = &resolution.segments[last];

            let mut constraint = if resolution.branches.is_empty() {
                match translate(&deepest.path, operator, value, resolution.terminal.kind) {
                    Some(query) => query,
                    None => return Ok(None),
                }
            } else {
                let parts = try_join_all(
                    resolution
                        .branches
                        .iter()
                        .map(|branch| self.fold_branch(&deepest.path, branch, operator, value)),
                )
                .await?;
                let parts: Vec<NativeQuery> = parts.into_iter().flatten().collect();
                if parts.is_empty() {
                    return Ok(None);
                }
                NativeQuery::any_of(parts)
            };

            for j in (0..last).rev() {
                let ids = self
                    .collect_ids(&resolution.segments[j + 1].entity, &constraint)
                    .await?;
                constraint = NativeQuery::path(
                    resolution.segments[j].path.clone(),
                    Comparison::op(NativeOp::In, Value::Array(ids)),
                );
            }

            Ok(Some(constraint))
        }
        .boxed()
    }

    /// Constrain a polymorphic relation to one candidate's matching documents.
    /// A has-many relation must match collection and id on the same element.
    async fn fold_branch(
        &self,
        relation_path: &str,
        branch: &PolymorphicBranch,
        operator: Operator,
        value: &Value,
    ) -> QueryResult<Option<NativeQuery>> {
        let Some(inner) = self.fold(&branch.resolution, operator, value).await? else {
            return Ok(None);
        };
        let ids = self.collect_ids(&branch.slug, &inner).await?;

        let pair = |prefix: &str| {
            NativeQuery::new()
                .with(
                    format!("{prefix}relationTo"),
                    Comparison::op(NativeOp::Eq, branch.slug.as_str()),
                )
                .with(
                    format!("{prefix}value"),
                    Comparison::op(NativeOp::In, Value::Array(ids.clone())),
                )
        };

        if branch.has_many {
            Ok(Some(NativeQuery::path(
                relation_path,
                Comparison::elem_match(pair("")),
            )))
        } else {
            Ok(Some(pair(&format!("{relation_path}."))))
        }
    }

    /// Run a sub-query and collect up to `sample_cap` identifiers.
    #[instrument(level = "debug", skip(self, query), fields(cap = self.sample_cap))]
    async fn collect_ids(&self, entity: &str, query: &NativeQuery) -> QueryResult<Vec<Value>> {
        let documents = self
            .store
            .find(entity, query, FindOptions::limit(self.sample_cap + 1))
            .await
            .map_err(|source| QueryError::RelationshipSubquery {
                entity: entity.to_string(),
                source,
            })?;

        if documents.len() > self.sample_cap {
            self.truncated.store(true, Ordering::Relaxed);
            warn!(entity, cap = self.sample_cap, "relationship sub-query truncated");
        }

        let ids: Vec<Value> = documents
            .iter()
            .take(self.sample_cap)
            .filter_map(document_id)
            .collect();
        debug!(entity, matched = ids.len(), "collected identifiers");
        Ok(ids)
    }
}

/// Identifier of a stored document. Object ids and strings become strings;
/// numeric ids stay numeric so they match stored numeric references.
fn document_id(document: &Value) -> Option<Value> {
    match document.get("_id")? {
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::Object(map) => map
            .get("$oid")
            .and_then(Value::as_str)
            .map(|s| Value::String(s.to_string())),
        _ => None,
    }
}
