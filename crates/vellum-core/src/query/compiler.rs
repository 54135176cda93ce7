//! Filter tree compilation.
//!
//! A [`QueryCompiler`] is created for one compile call. It owns the access
//! policy cache for that call and walks the client filter tree: boolean nodes
//! compile their children concurrently and combine the non-empty results,
//! conditions are resolved, checked and folded into native constraints.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use vellum_proto::{Clause, FilterNode, NativeQuery, Operator};

use super::error::{QueryError, QueryResult};
use super::folder::RelationshipFolder;
use super::resolver::{sanitize_path, PathResolver};
use super::sort::{resolve_sort, Sort};
use crate::catalog::{CompiledEntity, EntityRegistry};
use crate::config::{CompileOptions, CompilerConfig};
use crate::security::{AccessPolicyCache, PolicyService, RequestContext};
use crate::store::DocumentStore;

/// Result of compiling a client query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Native filter document.
    pub filter: NativeQuery,
    /// Resolved sort.
    pub sort: Sort,
    /// A relationship sub-query matched more documents than the sample cap,
    /// so the filter may miss matches.
    pub truncated: bool,
}

/// Compiler state for a single compile call.
pub struct QueryCompiler<'a> {
    registry: &'a EntityRegistry,
    config: &'a CompilerConfig,
    options: CompileOptions,
    cache: AccessPolicyCache,
    locale: Option<String>,
    folder: RelationshipFolder<'a>,
}

impl<'a> QueryCompiler<'a> {
    /// Create a compiler for one request.
    pub fn new(
        registry: &'a EntityRegistry,
        policy: Arc<dyn PolicyService>,
        store: &'a dyn DocumentStore,
        config: &'a CompilerConfig,
        request: RequestContext,
        options: CompileOptions,
    ) -> Self {
        let locale = request.locale.clone().or_else(|| {
            registry
                .localization()
                .map(|l| l.default_locale.clone())
        });
        Self {
            registry,
            config,
            options,
            cache: AccessPolicyCache::new(policy, Arc::new(request)),
            locale,
            folder: RelationshipFolder::new(store, config.sample_cap),
        }
    }

    /// The per-call policy cache.
    pub fn cache(&self) -> &AccessPolicyCache {
        &self.cache
    }

    /// Whether any relationship fold was truncated so far.
    pub fn truncated(&self) -> bool {
        self.folder.truncated()
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(
            self.registry,
            &self.cache,
            self.locale.as_deref(),
            self.options.override_access,
            self.config.near_bypasses_access,
        )
    }

    /// Look up an entity by slug.
    pub fn entity(&self, slug: &str) -> QueryResult<&'a CompiledEntity> {
        self.registry
            .lookup(slug)
            .ok_or_else(|| QueryError::UnknownEntity(slug.to_string()))
    }

    /// Compile a filter tree against an entity.
    #[instrument(
        skip_all,
        fields(entity = entity.slug(), request_id = %self.cache.request().request_id)
    )]
    pub async fn compile_where(
        &self,
        entity: &CompiledEntity,
        filter: &FilterNode,
    ) -> QueryResult<NativeQuery> {
        let query = self.compile_node(entity, filter).await?;
        debug!(
            paths = query.fields.len(),
            truncated = self.truncated(),
            "compiled filter"
        );
        Ok(query)
    }

    fn compile_node<'b>(
        &'b self,
        entity: &'b CompiledEntity,
        node: &'b FilterNode,
    ) -> BoxFuture<'b, QueryResult<NativeQuery>> {
        async move {
            match node {
                FilterNode::And(children) => {
                    let parts =
                        try_join_all(children.iter().map(|c| self.compile_node(entity, c))).await?;
                    Ok(NativeQuery::all_of(parts))
                }
                FilterNode::Or(children) => {
                    let parts =
                        try_join_all(children.iter().map(|c| self.compile_node(entity, c))).await?;
                    Ok(NativeQuery::any_of(parts))
                }
                FilterNode::Condition { path, clauses } => {
                    self.compile_condition(entity, path, clauses).await
                }
            }
        }
        .boxed()
    }

    /// Compile every clause on one path and merge them so all hold.
    async fn compile_condition(
        &self,
        entity: &CompiledEntity,
        path: &str,
        clauses: &[Clause],
    ) -> QueryResult<NativeQuery> {
        let mut query = NativeQuery::new();
        for clause in clauses {
            if let Some(part) = self.compile_clause(entity, path, clause).await? {
                query = query.merge(part);
            }
        }
        Ok(query)
    }

    async fn compile_clause(
        &self,
        entity: &CompiledEntity,
        path: &str,
        clause: &Clause,
    ) -> QueryResult<Option<NativeQuery>> {
        let Some(operator) = Operator::parse(&clause.operator) else {
            let err = QueryError::InvalidOperator(clause.operator.clone());
            warn!(entity = entity.slug(), path, error = %err, "dropping condition");
            return Ok(None);
        };

        let sanitized = sanitize_path(path);
        let resolution = self
            .resolver()
            .resolve(entity, &sanitized, operator, path)
            .await?;

        if resolution.is_hidden() && !self.options.include_hidden_fields {
            debug!(entity = entity.slug(), path, "dropping condition on hidden field");
            return Ok(None);
        }

        let folded = self.folder.fold(&resolution, operator, &clause.value).await?;
        if folded.is_none() {
            warn!(
                entity = entity.slug(),
                path,
                operator = operator.as_str(),
                "dropping condition with unusable value"
            );
        }
        Ok(folded)
    }

    /// Resolve a requested sort for an entity.
    pub async fn resolve_sort(
        &self,
        entity: &CompiledEntity,
        requested: Option<&str>,
    ) -> QueryResult<Sort> {
        resolve_sort(
            entity,
            requested,
            &self.cache,
            self.locale.as_deref(),
            self.options.override_access,
        )
        .await
    }

    /// Compile a `where` document and sort for an entity.
    pub async fn build(
        &self,
        slug: &str,
        where_clause: &Value,
        sort: Option<&str>,
    ) -> QueryResult<CompiledQuery> {
        let entity = self.entity(slug)?;
        let node = FilterNode::from_where(where_clause);
        let filter = if node.is_empty() {
            NativeQuery::new()
        } else {
            debug!(entity = slug, paths = ?node.paths(), "compiling where");
            self.compile_where(entity, &node).await?
        };
        let sort = self.resolve_sort(entity, sort).await?;

        Ok(CompiledQuery {
            filter,
            sort,
            truncated: self.truncated(),
        })
    }
}
