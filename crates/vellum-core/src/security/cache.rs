//! Per-compile cache of field read permissions.
//!
//! The first `ensure` for an entity starts the policy computation; concurrent
//! callers for the same entity await that same computation. The cache lives
//! for one compile call and is dropped with it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::context::RequestContext;
use super::error::PolicyResult;
use super::permission::FieldReadPermission;
use super::policy::{PolicyOperation, PolicyService};
use crate::catalog::CompiledEntity;

type Slot = Arc<OnceCell<Arc<FieldReadPermission>>>;

/// Memoized field permissions keyed by entity slug.
pub struct AccessPolicyCache {
    service: Arc<dyn PolicyService>,
    request: Arc<RequestContext>,
    entries: DashMap<String, Slot>,
    computations: AtomicUsize,
}

impl AccessPolicyCache {
    /// Create an empty cache for one request.
    pub fn new(service: Arc<dyn PolicyService>, request: Arc<RequestContext>) -> Self {
        Self {
            service,
            request,
            entries: DashMap::new(),
            computations: AtomicUsize::new(0),
        }
    }

    /// Request the cache computes permissions for.
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Get the read permissions for an entity, computing them on first use.
    pub async fn ensure(&self, entity: &CompiledEntity) -> PolicyResult<Arc<FieldReadPermission>> {
        // Clone the slot out so the map shard is not locked across the await.
        let slot: Slot = self
            .entries
            .entry(entity.slug().to_string())
            .or_default()
            .clone();

        let permission = slot
            .get_or_try_init(|| async {
                self.computations.fetch_add(1, Ordering::Relaxed);
                debug!(entity = entity.slug(), "computing field permissions");
                self.service
                    .compute(entity, &[PolicyOperation::Read], &self.request)
                    .await
                    .map(Arc::new)
                    .inspect_err(|e| {
                        warn!(entity = entity.slug(), error = %e, "policy computation failed")
                    })
            })
            .await?;

        Ok(Arc::clone(permission))
    }

    /// Permissions already computed for an entity, if any.
    pub fn get(&self, slug: &str) -> Option<Arc<FieldReadPermission>> {
        self.entries
            .get(slug)
            .and_then(|slot| slot.get().map(Arc::clone))
    }

    /// Number of policy computations started.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for AccessPolicyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPolicyCache")
            .field("request_id", &self.request.request_id)
            .field("entries", &self.entries.len())
            .field("computations", &self.computations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityConfig, EntityRegistry, FieldDef, SchemaConfig};
    use crate::security::error::PolicyError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct SlowPolicy;

    #[async_trait]
    impl PolicyService for SlowPolicy {
        async fn compute(
            &self,
            entity: &CompiledEntity,
            _operations: &[PolicyOperation],
            _request: &RequestContext,
        ) -> PolicyResult<FieldReadPermission> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(FieldReadPermission::from_fields(entity.slug(), [("title", true)]))
        }
    }

    struct FailingPolicy;

    #[async_trait]
    impl PolicyService for FailingPolicy {
        async fn compute(
            &self,
            entity: &CompiledEntity,
            _operations: &[PolicyOperation],
            _request: &RequestContext,
        ) -> PolicyResult<FieldReadPermission> {
            Err(PolicyError::Rejected {
                entity: entity.slug().to_string(),
                reason: "no session".into(),
            })
        }
    }

    fn registry() -> EntityRegistry {
        EntityRegistry::new(
            SchemaConfig::new()
                .with_collection(EntityConfig::collection("posts").with_field(FieldDef::text("title")))
                .with_collection(EntityConfig::collection("users")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_ensure_computes_once() {
        let registry = registry();
        let posts = registry.lookup("posts").unwrap();
        let cache = AccessPolicyCache::new(
            Arc::new(SlowPolicy),
            Arc::new(RequestContext::anonymous()),
        );

        let (a, b, c) = tokio::join!(cache.ensure(posts), cache.ensure(posts), cache.ensure(posts));
        assert!(a.unwrap().can_read("title"));
        assert!(b.is_ok());
        assert!(c.is_ok());
        assert_eq!(cache.computations(), 1);

        cache.ensure(registry.lookup("users").unwrap()).await.unwrap();
        assert_eq!(cache.computations(), 2);
        assert!(cache.get("posts").is_some());
        assert!(cache.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let registry = registry();
        let cache = AccessPolicyCache::new(
            Arc::new(FailingPolicy),
            Arc::new(RequestContext::anonymous()),
        );
        let err = cache.ensure(registry.lookup("posts").unwrap()).await.unwrap_err();
        assert!(matches!(err, PolicyError::Rejected { .. }));
        assert!(cache.get("posts").is_none());
    }
}
