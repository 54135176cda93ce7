//! Field read permissions.

use std::collections::HashMap;

/// Per-field read permission for one entity and one caller.
///
/// Keyed by policy key (field path without locale segments). Missing keys are
/// not readable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldReadPermission {
    entity: String,
    fields: HashMap<String, bool>,
}

impl FieldReadPermission {
    /// Create an empty permission set (nothing readable).
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: HashMap::new(),
        }
    }

    /// Build from `(policy key, readable)` pairs.
    pub fn from_fields<K, I>(entity: impl Into<String>, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, bool)>,
    {
        Self {
            entity: entity.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Grant or revoke read on a field.
    pub fn with_field(mut self, key: impl Into<String>, readable: bool) -> Self {
        self.fields.insert(key.into(), readable);
        self
    }

    /// Entity these permissions belong to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Check read permission. Unknown keys fail closed.
    pub fn can_read(&self, key: &str) -> bool {
        self.fields.get(key).copied().unwrap_or(false)
    }

    /// Readable keys, sorted.
    pub fn readable(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self
            .fields
            .iter()
            .filter(|(_, readable)| **readable)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}
