//! Shared query engine.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use super::compiler::{CompiledQuery, QueryCompiler};
use super::error::{QueryError, QueryResult};
use super::sort::Sort;
use crate::catalog::EntityRegistry;
use crate::config::{CompileOptions, CompilerConfig};
use crate::security::{PolicyService, RequestContext};
use crate::store::DocumentStore;

/// Long-lived handle holding everything a compile call needs.
///
/// Cheap to clone. Each call builds its own [`QueryCompiler`], so policy
/// decisions are never shared between requests.
#[derive(Clone)]
pub struct QueryEngine {
    registry: Arc<EntityRegistry>,
    policy: Arc<dyn PolicyService>,
    store: Arc<dyn DocumentStore>,
    config: CompilerConfig,
}

impl QueryEngine {
    /// Create an engine with the default configuration.
    pub fn new(
        registry: Arc<EntityRegistry>,
        policy: Arc<dyn PolicyService>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::with_config(registry, policy, store, CompilerConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(
        registry: Arc<EntityRegistry>,
        policy: Arc<dyn PolicyService>,
        store: Arc<dyn DocumentStore>,
        config: CompilerConfig,
    ) -> Self {
        Self {
            registry,
            policy,
            store,
            config,
        }
    }

    /// Compiled schema.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Store used for relationship sub-queries.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Compiler settings shared by every request.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Create a compiler for one request.
    pub fn compiler(&self, request: RequestContext, options: CompileOptions) -> QueryCompiler<'_> {
        QueryCompiler::new(
            &self.registry,
            Arc::clone(&self.policy),
            self.store.as_ref(),
            &self.config,
            request,
            options,
        )
    }

    /// Compile a `where` document and optional sort for `slug`.
    #[instrument(skip(self, where_clause, request, options), fields(request_id = %request.request_id))]
    pub async fn compile_query(
        &self,
        slug: &str,
        where_clause: &Value,
        sort: Option<&str>,
        request: RequestContext,
        options: CompileOptions,
    ) -> QueryResult<CompiledQuery> {
        let compiler = self.compiler(request, options);
        let compiled = compiler.build(slug, where_clause, sort).await?;
        debug!(
            policy_computations = compiler.cache().computations(),
            "query compiled"
        );
        if compiled.truncated {
            debug!(cap = self.config.sample_cap, "relationship sample truncated");
        }
        Ok(compiled)
    }

    /// Resolve only a sort for `slug`.
    pub async fn resolve_sort(
        &self,
        slug: &str,
        requested: Option<&str>,
        request: RequestContext,
        options: CompileOptions,
    ) -> QueryResult<Sort> {
        let compiler = self.compiler(request, options);
        let entity = self
            .registry
            .lookup(slug)
            .ok_or_else(|| QueryError::UnknownEntity(slug.to_string()))?;
        compiler.resolve_sort(entity, requested).await
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("entities", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
