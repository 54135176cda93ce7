//! In-memory document store.
//!
//! Evaluates native queries against JSON documents with document-store
//! semantics: dotted paths descend into objects and fan out over arrays, a
//! comparison holds when any reached value satisfies it, and `{"$oid": hex}`
//! identifiers compare equal to their hex string.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::RegexBuilder;
use serde_json::Value;
use tracing::trace;
use vellum_proto::{Comparison, NativeOp, NativeQuery};

use super::{DocumentStore, FindOptions, StoreError, StoreResult};

/// Document store backed by in-memory JSON documents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from documents keyed by collection slug.
    pub fn from_documents(documents: HashMap<String, Vec<Value>>) -> Self {
        Self {
            collections: RwLock::new(documents),
        }
    }

    /// Register an empty collection.
    pub fn create_collection(&self, entity: impl Into<String>) {
        self.collections.write().entry(entity.into()).or_default();
    }

    /// Insert a document.
    pub fn insert(&self, entity: impl Into<String>, document: Value) {
        self.collections
            .write()
            .entry(entity.into())
            .or_default()
            .push(document);
    }

    /// Insert several documents.
    pub fn insert_many(&self, entity: impl Into<String>, documents: impl IntoIterator<Item = Value>) {
        self.collections
            .write()
            .entry(entity.into())
            .or_default()
            .extend(documents);
    }

    /// Number of documents in a collection.
    pub fn len(&self, entity: &str) -> usize {
        self.collections.read().get(entity).map_or(0, Vec::len)
    }

    /// Whether a collection is empty or missing.
    pub fn is_empty(&self, entity: &str) -> bool {
        self.len(entity) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        entity: &str,
        query: &NativeQuery,
        options: FindOptions,
    ) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read();
        let documents = collections
            .get(entity)
            .ok_or_else(|| StoreError::UnknownCollection(entity.to_string()))?;

        let limit = options.limit.unwrap_or(usize::MAX);
        let mut found = Vec::new();
        for document in documents {
            if found.len() >= limit {
                break;
            }
            if DocumentMatcher::matches(query, document)? {
                found.push(document.clone());
            }
        }

        trace!(entity, scanned = documents.len(), found = found.len(), "memory find");
        Ok(found)
    }
}

/// Evaluates native queries against JSON documents.
pub struct DocumentMatcher;

impl DocumentMatcher {
    /// Check whether a document satisfies a query.
    pub fn matches(query: &NativeQuery, document: &Value) -> StoreResult<bool> {
        for (path, comparisons) in &query.fields {
            let values = Self::resolve(document, path);
            for comparison in comparisons {
                if !Self::evaluate(comparison, &values)? {
                    return Ok(false);
                }
            }
        }
        for sub in &query.and {
            if !Self::matches(sub, document)? {
                return Ok(false);
            }
        }
        if !query.or.is_empty() {
            for sub in &query.or {
                if Self::matches(sub, document)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Collect every value reachable at a dotted path. Arrays met on the way
    /// fan out; an array at the end contributes itself and its elements.
    fn resolve<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
        let mut current = vec![document];
        for segment in path.split('.') {
            let mut next = Vec::new();
            for value in current {
                Self::descend(value, segment, &mut next);
            }
            current = next;
        }

        let mut values = Vec::with_capacity(current.len());
        for value in current {
            values.push(value);
            if let Value::Array(items) = value {
                values.extend(items.iter());
            }
        }
        values
    }

    fn descend<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
        match value {
            Value::Object(map) => {
                if let Some(child) = map.get(segment) {
                    out.push(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    Self::descend(item, segment, out);
                }
            }
            _ => {}
        }
    }

    fn evaluate(comparison: &Comparison, values: &[&Value]) -> StoreResult<bool> {
        match comparison {
            Comparison::Op { op, value } => Self::evaluate_op(*op, value, values),
            Comparison::Regex { pattern, options } => Self::evaluate_regex(pattern, options, values),
            Comparison::ElemMatch(query) => Self::evaluate_elem_match(query, values),
            Comparison::Raw(Value::Object(body))
                if !body.is_empty() && body.keys().all(|k| k.starts_with('$')) =>
            {
                for (key, operand) in body {
                    let result = match key.as_str() {
                        "$regex" => {
                            let pattern = operand.as_str().unwrap_or_default();
                            let options = body.get("$options").and_then(Value::as_str).unwrap_or("");
                            Self::evaluate_regex(pattern, options, values)?
                        }
                        "$options" => true,
                        other => {
                            let op = NativeOp::from_key(other)
                                .ok_or_else(|| StoreError::Unsupported(other.to_string()))?;
                            Self::evaluate_op(op, operand, values)?
                        }
                    };
                    if !result {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Comparison::Raw(value) => Self::evaluate_op(NativeOp::Eq, value, values),
        }
    }

    fn evaluate_op(op: NativeOp, operand: &Value, values: &[&Value]) -> StoreResult<bool> {
        let result = match op {
            NativeOp::Eq => Self::any_equal(values, operand),
            NativeOp::Ne => !Self::any_equal(values, operand),
            NativeOp::In => Self::list(operand)
                .iter()
                .any(|candidate| Self::any_equal(values, candidate)),
            NativeOp::Nin => !Self::list(operand)
                .iter()
                .any(|candidate| Self::any_equal(values, candidate)),
            NativeOp::All => {
                let wanted = Self::list(operand);
                !wanted.is_empty() && wanted.iter().all(|w| Self::any_equal(values, w))
            }
            NativeOp::Exists => {
                let wanted = match operand {
                    Value::Bool(b) => *b,
                    Value::Null => false,
                    _ => true,
                };
                values.is_empty() != wanted
            }
            NativeOp::Gt => Self::any_ordered(values, operand, Ordering::is_gt),
            NativeOp::Gte => Self::any_ordered(values, operand, Ordering::is_ge),
            NativeOp::Lt => Self::any_ordered(values, operand, Ordering::is_lt),
            NativeOp::Lte => Self::any_ordered(values, operand, Ordering::is_le),
            // Geo queries need a spatial index.
            NativeOp::Near => false,
        };
        Ok(result)
    }

    /// Some element of a stored array must satisfy the whole query.
    fn evaluate_elem_match(query: &NativeQuery, values: &[&Value]) -> StoreResult<bool> {
        for value in values {
            if let Value::Array(items) = value {
                for item in items {
                    if Self::matches(query, item)? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn evaluate_regex(pattern: &str, options: &str, values: &[&Value]) -> StoreResult<bool> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in options.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                other => return Err(StoreError::Unsupported(format!("$options flag {other}"))),
            }
        }
        let regex = builder.build().map_err(|e| StoreError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(values
            .iter()
            .filter_map(|v| v.as_str())
            .any(|s| regex.is_match(s)))
    }

    fn list(operand: &Value) -> Vec<Value> {
        match operand {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    fn any_equal(values: &[&Value], operand: &Value) -> bool {
        if values.is_empty() {
            return operand.is_null();
        }
        values.iter().any(|v| Self::values_equal(v, operand))
    }

    fn any_ordered(values: &[&Value], operand: &Value, accept: fn(Ordering) -> bool) -> bool {
        values
            .iter()
            .any(|v| Self::compare_values(v, operand).is_some_and(accept))
    }

    /// Unwrap `{"$oid": hex}` to its hex string.
    fn normalize(value: &Value) -> &Value {
        match value {
            Value::Object(map) if map.len() == 1 => map.get("$oid").unwrap_or(value),
            _ => value,
        }
    }

    fn values_equal(a: &Value, b: &Value) -> bool {
        match (Self::normalize(a), Self::normalize(b)) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (a, b) => a == b,
        }
    }

    fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (Self::normalize(a), Self::normalize(b)) {
            (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_many(
            "users",
            vec![
                json!({ "_id": { "$oid": "64b7f0c2a1b2c3d4e5f60001" }, "email": "ada@example.com", "age": 36, "tags": ["admin", "ops"] }),
                json!({ "_id": { "$oid": "64b7f0c2a1b2c3d4e5f60002" }, "email": "bob@example.com", "age": 17, "profile": { "city": "Lisbon" } }),
                json!({ "_id": "64b7f0c2a1b2c3d4e5f60003", "email": "cy@example.org", "age": 52, "addresses": [{ "city": "Paris", "country": "FR" }, { "city": "Oslo", "country": "NO" }] }),
            ],
        );
        store
    }

    async fn count(store: &MemoryStore, query: NativeQuery) -> usize {
        store
            .find("users", &query, FindOptions::default())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_equality_and_ranges() {
        let store = store();
        assert_eq!(
            count(&store, NativeQuery::path("email", Comparison::op(NativeOp::Eq, "bob@example.com"))).await,
            1
        );
        let adults = NativeQuery::path("age", Comparison::op(NativeOp::Gte, 18))
            .with("age", Comparison::op(NativeOp::Lt, 50));
        assert_eq!(count(&store, adults).await, 1);
        assert_eq!(
            count(&store, NativeQuery::path("age", Comparison::op(NativeOp::Ne, 17))).await,
            2
        );
    }

    #[tokio::test]
    async fn test_object_ids_and_in() {
        let store = store();
        let ids = json!(["64b7f0c2a1b2c3d4e5f60001", "64b7f0c2a1b2c3d4e5f60003"]);
        let by_id = NativeQuery::path("_id", Comparison::op(NativeOp::In, ids));
        assert_eq!(count(&store, by_id).await, 2);

        let by_oid = NativeQuery::path(
            "_id",
            Comparison::op(NativeOp::Eq, json!({ "$oid": "64b7f0c2a1b2c3d4e5f60003" })),
        );
        assert_eq!(count(&store, by_oid).await, 1);
    }

    #[tokio::test]
    async fn test_arrays_and_nested_paths() {
        let store = store();
        assert_eq!(
            count(&store, NativeQuery::path("addresses.city", Comparison::op(NativeOp::Eq, "Oslo"))).await,
            1
        );
        assert_eq!(
            count(&store, NativeQuery::path("tags", Comparison::op(NativeOp::All, json!(["admin", "ops"])))).await,
            1
        );
        assert_eq!(
            count(&store, NativeQuery::path("tags", Comparison::op(NativeOp::Nin, json!(["admin"])))).await,
            2
        );
        assert_eq!(
            count(&store, NativeQuery::path("profile.city", Comparison::op(NativeOp::Exists, true))).await,
            1
        );
        assert_eq!(
            count(&store, NativeQuery::path("profile", Comparison::op(NativeOp::Exists, false))).await,
            2
        );
    }

    #[tokio::test]
    async fn test_regex_and_boolean_groups() {
        let store = store();
        assert_eq!(
            count(&store, NativeQuery::path("email", Comparison::regex("EXAMPLE\\.com"))).await,
            2
        );

        let either = NativeQuery::any_of(vec![
            NativeQuery::path("age", Comparison::op(NativeOp::Lt, 18)),
            NativeQuery::path("email", Comparison::regex("\\.org$")),
        ]);
        assert_eq!(count(&store, either).await, 2);

        let both = NativeQuery::all_of(vec![
            NativeQuery::path("age", Comparison::op(NativeOp::Gt, 18)),
            NativeQuery::path("email", Comparison::regex("\\.org$")),
        ]);
        assert_eq!(count(&store, both).await, 1);
    }

    #[tokio::test]
    async fn test_elem_match_binds_one_element() {
        let store = store();

        // Flat paths may be satisfied by different elements.
        let flat = NativeQuery::path("addresses.city", Comparison::op(NativeOp::Eq, "Paris"))
            .with("addresses.country", Comparison::op(NativeOp::Eq, "NO"));
        assert_eq!(count(&store, flat).await, 1);

        let mismatched = NativeQuery::path("city", Comparison::op(NativeOp::Eq, "Paris"))
            .with("country", Comparison::op(NativeOp::Eq, "NO"));
        assert_eq!(
            count(&store, NativeQuery::path("addresses", Comparison::elem_match(mismatched))).await,
            0
        );

        let matched = NativeQuery::path("city", Comparison::op(NativeOp::Eq, "Paris"))
            .with("country", Comparison::op(NativeOp::In, json!(["FR", "BE"])));
        assert_eq!(
            count(&store, NativeQuery::path("addresses", Comparison::elem_match(matched))).await,
            1
        );

        // Not an array.
        let city = NativeQuery::path("city", Comparison::op(NativeOp::Eq, "Lisbon"));
        assert_eq!(
            count(&store, NativeQuery::path("profile", Comparison::elem_match(city))).await,
            0
        );
    }

    #[tokio::test]
    async fn test_near_never_matches() {
        let store = store();
        let near = NativeQuery::path(
            "location",
            Comparison::Raw(json!({ "$near": { "$geometry": { "type": "Point", "coordinates": [0, 0] } } })),
        );
        assert_eq!(count(&store, near).await, 0);
    }

    #[tokio::test]
    async fn test_limit_and_errors() {
        let store = store();
        let all = store
            .find("users", &NativeQuery::new(), FindOptions::limit(2))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let err = store
            .find("missing", &NativeQuery::new(), FindOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownCollection("missing".into()));

        let err = store
            .find("users", &NativeQuery::path("email", Comparison::regex("(")), FindOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRegex { .. }));
    }
}
