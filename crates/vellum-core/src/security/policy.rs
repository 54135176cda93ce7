//! Policy services compute field read permissions for a caller.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::RequestContext;
use super::error::PolicyResult;
use super::permission::FieldReadPermission;
use crate::catalog::CompiledEntity;

/// Operations a permission set can be computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyOperation {
    Read,
}

/// Computes field permissions for an entity and a caller.
///
/// Implementations may be slow (database lookups, remote calls); results are
/// memoized per compile call by [`AccessPolicyCache`](super::AccessPolicyCache).
#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Compute read permissions for every field of `entity`.
    async fn compute(
        &self,
        entity: &CompiledEntity,
        operations: &[PolicyOperation],
        request: &RequestContext,
    ) -> PolicyResult<FieldReadPermission>;
}

/// Access rule for a field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldAccess {
    /// Readable by anyone.
    #[default]
    Public,
    /// Readable by authenticated callers.
    Authenticated,
    /// Readable by callers holding the role.
    Role(String),
    /// Never readable.
    Denied,
}

impl FieldAccess {
    /// Check whether a caller satisfies this rule.
    pub fn allows(&self, request: &RequestContext) -> bool {
        match self {
            FieldAccess::Public => true,
            FieldAccess::Authenticated => request.is_authenticated(),
            FieldAccess::Role(role) => request.has_role(role),
            FieldAccess::Denied => false,
        }
    }
}

/// Access rules keyed by policy key.
pub type EntityRules = HashMap<String, FieldAccess>;

/// Policy service driven by static per-field rules.
///
/// A field is readable when the rule on its key and the rules on every
/// enclosing container allow the caller. Fields without any rule fall back to
/// the default access. Callers holding the admin role read everything.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedPolicy {
    rules: HashMap<String, EntityRules>,
    default_access: FieldAccess,
    admin_role: Option<String>,
}

impl RuleBasedPolicy {
    /// Create a policy where every field is public.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a rule map (`entity -> field -> access`).
    pub fn from_rules(rules: HashMap<String, EntityRules>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Set a rule for one field.
    pub fn with_rule(
        mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        access: FieldAccess,
    ) -> Self {
        self.rules
            .entry(entity.into())
            .or_default()
            .insert(field.into(), access);
        self
    }

    /// Access for fields without a rule.
    pub fn with_default_access(mut self, access: FieldAccess) -> Self {
        self.default_access = access;
        self
    }

    /// Role that bypasses every rule.
    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.admin_role = Some(role.into());
        self
    }

    fn is_admin(&self, request: &RequestContext) -> bool {
        self.admin_role
            .as_deref()
            .is_some_and(|role| request.has_role(role))
    }

    fn is_readable(&self, rules: Option<&EntityRules>, key: &str, request: &RequestContext) -> bool {
        let Some(rules) = rules else {
            return self.default_access.allows(request);
        };

        let mut matched = false;
        let mut prefix_end = 0;
        loop {
            let end = key[prefix_end..]
                .find('.')
                .map(|i| prefix_end + i)
                .unwrap_or(key.len());
            if let Some(access) = rules.get(&key[..end]) {
                matched = true;
                if !access.allows(request) {
                    return false;
                }
            }
            if end == key.len() {
                break;
            }
            prefix_end = end + 1;
        }

        matched || self.default_access.allows(request)
    }
}

#[async_trait]
impl PolicyService for RuleBasedPolicy {
    async fn compute(
        &self,
        entity: &CompiledEntity,
        _operations: &[PolicyOperation],
        request: &RequestContext,
    ) -> PolicyResult<FieldReadPermission> {
        let admin = self.is_admin(request);
        let rules = self.rules.get(entity.slug());

        let fields: Vec<(String, bool)> = entity
            .index
            .policy_keys()
            .into_iter()
            .map(|key| {
                let readable = admin || self.is_readable(rules, key, request);
                (key.to_string(), readable)
            })
            .collect();

        debug!(
            entity = entity.slug(),
            request_id = %request.request_id,
            fields = fields.len(),
            "computed field permissions"
        );
        Ok(FieldReadPermission::from_fields(entity.slug(), fields))
    }
}
