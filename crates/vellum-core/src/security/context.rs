//! Request context passed to the policy service.
//!
//! Carries the caller's identity and the active locale for one compile call.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

/// Caller-scoped request context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request identifier used in logs.
    pub request_id: String,
    /// Active locale, if the caller selected one.
    pub locale: Option<String>,
    /// Authenticated user id; `None` for anonymous callers.
    pub user: Option<String>,
    /// Roles granted to the user.
    pub roles: BTreeSet<String>,
    /// Extra attributes available to policy services.
    pub attributes: HashMap<String, Value>,
}

impl RequestContext {
    /// Create a context for an anonymous caller.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Create an anonymous context with a generic request id.
    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }

    /// Set the active locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the authenticated user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Grant a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get an attribute as a string value.
    pub fn get_attribute_string(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Check if a user is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Check if the user holds a role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
