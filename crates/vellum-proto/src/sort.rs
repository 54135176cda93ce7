//! Sort specifications.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Native direction value (`1` / `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// A resolved sort: stored property plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Stored property path.
    pub property: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Ascending sort on a property.
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on a property.
    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            order: SortOrder::Desc,
        }
    }

    /// Split a client sort string: a leading `-` means descending.
    pub fn parse_requested(requested: &str) -> (&str, SortOrder) {
        match requested.strip_prefix('-') {
            Some(field) => (field, SortOrder::Desc),
            None => (requested, SortOrder::Asc),
        }
    }

    /// Render as a native sort document.
    pub fn to_json(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        doc.insert(self.property.clone(), self.order.as_i32().into());
        serde_json::Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requested() {
        assert_eq!(SortSpec::parse_requested("-title"), ("title", SortOrder::Desc));
        assert_eq!(SortSpec::parse_requested("title"), ("title", SortOrder::Asc));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            SortSpec::desc("createdAt").to_json(),
            serde_json::json!({ "createdAt": -1 })
        );
    }
}
