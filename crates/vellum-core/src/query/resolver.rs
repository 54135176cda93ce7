//! Path resolution.
//!
//! Walks a dotted path through an entity's schema index, descending into
//! relationship targets, choosing locale-qualified paths and checking read
//! permission at every field boundary. Each recursive call returns its own
//! resolution; callers prepend their segment.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;
use vellum_proto::Operator;

use super::error::{QueryError, QueryResult};
use super::operator::ValueKind;
use crate::catalog::{
    CompiledEntity, EntityRegistry, LeafKind, PathClass, PathInfo, PathKind, RelationTarget,
    SchemaIndex, ID_PATH,
};
use crate::security::{AccessPolicyCache, FieldReadPermission};

/// Replace GraphQL `__` separators and map `id` to the stored identifier.
pub fn sanitize_path(path: &str) -> String {
    let path = path.replace("__", ".");
    if path == "id" {
        ID_PATH.to_string()
    } else {
        path
    }
}

/// Pick the stored path for a possibly localized field. An explicit locale
/// (or any stored child) in the next segment keeps the path as is; otherwise
/// the active locale is appended when that path is stored, or always when
/// `force` is set.
pub(crate) fn localize_path(
    index: &SchemaIndex,
    current: String,
    info: &PathInfo,
    next: Option<&str>,
    locale: Option<&str>,
    force: bool,
) -> String {
    if !info.localized {
        return current;
    }
    if let Some(next) = next {
        if index.contains(&format!("{current}.{next}")) {
            return current;
        }
    }
    match locale {
        Some(locale) => {
            let localized = format!("{current}.{locale}");
            if force || index.contains(&localized) {
                localized
            } else {
                current
            }
        }
        None => current,
    }
}

/// One entity's share of a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegmentResolution {
    /// Owning entity slug.
    pub entity: String,
    /// Stored path inside that entity.
    pub path: String,
    /// The path reaches a field or leaves the entity through a relationship;
    /// `false` when it stops on a container.
    pub complete: bool,
}

/// The field a resolved path ends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    /// Value coercion for the field.
    pub kind: ValueKind,
    /// Whether the field is hidden.
    pub hidden: bool,
}

/// Continuation of a path through one candidate of a polymorphic relation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolymorphicBranch {
    /// Candidate collection.
    pub slug: String,
    /// The relation stores a list of `{relationTo, value}` pairs.
    pub has_many: bool,
    /// Resolution of the remaining path inside the candidate.
    pub resolution: PathResolution,
}

/// A fully resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResolution {
    /// Segments from the queried entity down to the deepest one.
    pub segments: Vec<PathSegmentResolution>,
    /// When the deepest segment is a polymorphic relation, the candidates the
    /// path continues through.
    pub branches: Vec<PolymorphicBranch>,
    /// The field the path ends on.
    pub terminal: Terminal,
}

impl PathResolution {
    fn single(entity: &CompiledEntity, path: String, complete: bool, terminal: Terminal) -> Self {
        Self {
            segments: vec![PathSegmentResolution {
                entity: entity.slug().to_string(),
                path,
                complete,
            }],
            branches: Vec::new(),
            terminal,
        }
    }

    /// The segment in the queried entity.
    pub fn top(&self) -> &PathSegmentResolution {
        &self.segments[0]
    }

    /// Whether the path crosses into other entities.
    pub fn spans_entities(&self) -> bool {
        self.segments.len() > 1 || !self.branches.is_empty()
    }

    /// Whether the path ends on a hidden field in any branch.
    pub fn is_hidden(&self) -> bool {
        if self.branches.is_empty() {
            self.terminal.hidden
        } else {
            self.branches.iter().any(|b| b.resolution.is_hidden())
        }
    }
}

/// Resolves paths for one compile call.
pub struct PathResolver<'a> {
    registry: &'a EntityRegistry,
    cache: &'a AccessPolicyCache,
    locale: Option<&'a str>,
    override_access: bool,
    near_bypasses_access: bool,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver.
    pub fn new(
        registry: &'a EntityRegistry,
        cache: &'a AccessPolicyCache,
        locale: Option<&'a str>,
        override_access: bool,
        near_bypasses_access: bool,
    ) -> Self {
        Self {
            registry,
            cache,
            locale,
            override_access,
            near_bypasses_access,
        }
    }

    /// Whether read permission is checked for conditions using `operator`.
    pub fn gates(&self, operator: Operator) -> bool {
        !self.override_access && !(operator.is_geo() && self.near_bypasses_access)
    }

    /// Resolve an already sanitized path. Errors report `requested_path`.
    pub fn resolve<'b>(
        &'b self,
        entity: &'b CompiledEntity,
        path: &'b str,
        operator: Operator,
        requested_path: &'b str,
    ) -> BoxFuture<'b, QueryResult<PathResolution>> {
        let segments = path.split('.').map(str::to_string).collect();
        self.resolve_segments(entity, segments, operator, requested_path)
    }

    async fn permission(&self, entity: &CompiledEntity) -> QueryResult<Arc<FieldReadPermission>> {
        self.cache
            .ensure(entity)
            .await
            .map_err(|source| QueryError::PolicyComputation {
                entity: entity.slug().to_string(),
                source,
            })
    }

    fn lookup(&self, slug: &str) -> QueryResult<&'a CompiledEntity> {
        self.registry
            .lookup(slug)
            .ok_or_else(|| QueryError::UnknownEntity(slug.to_string()))
    }

    fn localize(
        &self,
        index: &SchemaIndex,
        current: String,
        info: &PathInfo,
        next: Option<&str>,
        operator: Operator,
    ) -> String {
        localize_path(index, current, info, next, self.locale, operator.is_geo())
    }

    fn resolve_segments<'b>(
        &'b self,
        entity: &'b CompiledEntity,
        mut segments: Vec<String>,
        operator: Operator,
        requested_path: &'b str,
    ) -> BoxFuture<'b, QueryResult<PathResolution>> {
        async move {
            let forbidden = || QueryError::UnknownOrForbiddenPath(requested_path.to_string());
            if segments.is_empty() || segments.iter().any(String::is_empty) {
                return Err(forbidden());
            }
            if segments[0] == "id" {
                segments[0] = ID_PATH.to_string();
            }

            let permission = if self.gates(operator) {
                Some(self.permission(entity).await?)
            } else {
                None
            };
            let readable = |info: &PathInfo| {
                info.policy_key == "id"
                    || permission
                        .as_ref()
                        .map_or(true, |p| p.can_read(&info.policy_key))
            };

            let index = &entity.index;
            let mut path = String::new();
            let mut i = 0;

            while i < segments.len() {
                let current = if path.is_empty() {
                    segments[i].clone()
                } else {
                    format!("{path}.{}", segments[i])
                };
                let next = segments.get(i + 1).map(String::as_str);
                let is_last = next.is_none();

                match index.classify(&current) {
                    PathClass::Unknown => {
                        debug!(entity = entity.slug(), path = %current, "unknown path");
                        return Err(forbidden());
                    }
                    PathClass::Nested { info } => {
                        if is_last {
                            if !readable(info) {
                                return Err(forbidden());
                            }
                            let terminal = Terminal {
                                kind: ValueKind::Other,
                                hidden: info.hidden,
                            };
                            return Ok(PathResolution::single(entity, current, false, terminal));
                        }
                        path = self.localize(index, current, info, next, operator);
                        i += 1;
                    }
                    PathClass::Leaf { info, kind } => {
                        if !readable(info) {
                            return Err(forbidden());
                        }
                        if let Some(next) = next {
                            if index.contains(&format!("{current}.{next}")) {
                                path = current;
                                i += 1;
                                continue;
                            }
                        }

                        let base = self.localize(index, current, info, next, operator);
                        let terminal = Terminal {
                            kind: ValueKind::from_leaf(kind),
                            hidden: info.hidden,
                        };
                        if is_last {
                            return Ok(PathResolution::single(entity, base, true, terminal));
                        }
                        // Only JSON leaves have addressable structure below them.
                        if kind != LeafKind::Json {
                            return Err(forbidden());
                        }
                        let rest = segments[i + 1..].join(".");
                        let terminal = Terminal {
                            kind: ValueKind::Other,
                            ..terminal
                        };
                        return Ok(PathResolution::single(
                            entity,
                            format!("{base}.{rest}"),
                            true,
                            terminal,
                        ));
                    }
                    PathClass::Relation { info, target } => {
                        if !readable(info) {
                            return Err(forbidden());
                        }
                        // Explicit locale, or a polymorphic `value` / `relationTo` column.
                        if let Some(next) = next {
                            if index.contains(&format!("{current}.{next}")) {
                                path = current;
                                i += 1;
                                continue;
                            }
                        }

                        let base = self.localize(index, current, info, next, operator);
                        if is_last {
                            let terminal = Terminal {
                                kind: ValueKind::Reference,
                                hidden: info.hidden,
                            };
                            return Ok(PathResolution::single(entity, base, true, terminal));
                        }

                        let suffix = segments[i + 1..].to_vec();
                        let head = PathSegmentResolution {
                            entity: entity.slug().to_string(),
                            path: base,
                            complete: true,
                        };
                        return self
                            .descend(head, target, info, suffix, operator, requested_path)
                            .await;
                    }
                }
            }

            Err(forbidden())
        }
        .boxed()
    }

    async fn descend(
        &self,
        head: PathSegmentResolution,
        target: &RelationTarget,
        relation: &PathInfo,
        suffix: Vec<String>,
        operator: Operator,
        requested_path: &str,
    ) -> QueryResult<PathResolution> {
        let hidden = relation.hidden;
        match target {
            RelationTarget::Fixed(slug) => {
                let target = self.lookup(slug)?;
                debug!(from = %head.entity, to = %slug, path = %head.path, "descending into relation");
                let child = self
                    .resolve_segments(target, suffix, operator, requested_path)
                    .await?;

                let mut segments = Vec::with_capacity(child.segments.len() + 1);
                segments.push(head);
                segments.extend(child.segments);
                Ok(PathResolution {
                    segments,
                    branches: child.branches,
                    terminal: Terminal {
                        hidden: hidden || child.terminal.hidden,
                        ..child.terminal
                    },
                })
            }
            RelationTarget::Polymorphic(slugs) => {
                let has_many = matches!(relation.kind, PathKind::Relation { has_many: true, .. });
                let branches = self
                    .resolve_branches(slugs, has_many, &suffix, operator, requested_path)
                    .await?;
                let Some(first) = branches.first() else {
                    return Err(QueryError::UnknownOrForbiddenPath(requested_path.to_string()));
                };
                let terminal = Terminal {
                    hidden: hidden || first.resolution.terminal.hidden,
                    ..first.resolution.terminal
                };
                Ok(PathResolution {
                    segments: vec![head],
                    branches,
                    terminal,
                })
            }
        }
    }

    /// Resolve the remaining path in every candidate of a polymorphic
    /// relation. Candidates that do not grant the next field, or where the
    /// path does not exist, are left out.
    async fn resolve_branches(
        &self,
        slugs: &[String],
        has_many: bool,
        suffix: &[String],
        operator: Operator,
        requested_path: &str,
    ) -> QueryResult<Vec<PolymorphicBranch>> {
        let first = sanitize_path(&suffix[0]);
        let mut branches = Vec::new();

        for slug in slugs {
            let target = self.lookup(slug)?;
            if self.gates(operator) && first != ID_PATH {
                let permission = self.permission(target).await?;
                if !permission.can_read(&first) {
                    debug!(candidate = %slug, field = %first, "candidate does not grant field");
                    continue;
                }
            }

            match self
                .resolve_segments(target, suffix.to_vec(), operator, requested_path)
                .await
            {
                Ok(resolution) => branches.push(PolymorphicBranch {
                    slug: slug.clone(),
                    has_many,
                    resolution,
                }),
                Err(QueryError::UnknownOrForbiddenPath(_)) => {
                    debug!(candidate = %slug, "path does not resolve in candidate");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(branches)
    }
}
