//! Native query documents.
//!
//! `NativeQuery` is the document-store filter the compiler emits. It renders
//! to a Mongo-style JSON filter with [`NativeQuery::to_json`]. Merging is a
//! total structural function: comparisons on the same path accumulate instead
//! of overwriting, and two disjunctions are conjoined rather than flattened so
//! a merge can only narrow the result set.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Native comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeOp {
    Eq,
    Ne,
    In,
    Nin,
    All,
    Exists,
    Gt,
    Gte,
    Lt,
    Lte,
    Near,
}

impl NativeOp {
    /// Operator key as written in the native filter document.
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeOp::Eq => "$eq",
            NativeOp::Ne => "$ne",
            NativeOp::In => "$in",
            NativeOp::Nin => "$nin",
            NativeOp::All => "$all",
            NativeOp::Exists => "$exists",
            NativeOp::Gt => "$gt",
            NativeOp::Gte => "$gte",
            NativeOp::Lt => "$lt",
            NativeOp::Lte => "$lte",
            NativeOp::Near => "$near",
        }
    }

    /// Parse a native operator key such as `$gte`.
    pub fn from_key(key: &str) -> Option<Self> {
        let op = match key {
            "$eq" => NativeOp::Eq,
            "$ne" => NativeOp::Ne,
            "$in" => NativeOp::In,
            "$nin" => NativeOp::Nin,
            "$all" => NativeOp::All,
            "$exists" => NativeOp::Exists,
            "$gt" => NativeOp::Gt,
            "$gte" => NativeOp::Gte,
            "$lt" => NativeOp::Lt,
            "$lte" => NativeOp::Lte,
            "$near" => NativeOp::Near,
            _ => return None,
        };
        Some(op)
    }
}

/// A single constraint on a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// `{ <op>: value }`
    Op {
        /// Operator.
        op: NativeOp,
        /// Operand.
        value: Value,
    },
    /// `{ $regex: pattern, $options: options }`
    Regex {
        /// Regular expression source, already escaped where needed.
        pattern: String,
        /// Regex flags.
        options: String,
    },
    /// A fully-formed value used verbatim (operator-less match).
    Raw(Value),
    /// `{ $elemMatch: query }`: one array element must satisfy the whole
    /// query, with paths relative to the element.
    ElemMatch(NativeQuery),
}

impl Comparison {
    /// Create an operator comparison.
    pub fn op(op: NativeOp, value: impl Into<Value>) -> Self {
        Comparison::Op {
            op,
            value: value.into(),
        }
    }

    /// Create a case-insensitive regex comparison.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Comparison::Regex {
            pattern: pattern.into(),
            options: "i".to_string(),
        }
    }

    /// Create an `$elemMatch` comparison.
    pub fn elem_match(query: NativeQuery) -> Self {
        Comparison::ElemMatch(query)
    }
}

/// A native filter document: path constraints plus `$and` / `$or` groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeQuery {
    /// Constraints keyed by stored path. All of them must hold.
    pub fields: BTreeMap<String, Vec<Comparison>>,
    /// Sub-documents that must all match.
    pub and: Vec<NativeQuery>,
    /// Sub-documents of which at least one must match.
    pub or: Vec<NativeQuery>,
}

impl NativeQuery {
    /// Create an empty query (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query with a single path constraint.
    pub fn path(path: impl Into<String>, comparison: Comparison) -> Self {
        Self::new().with(path, comparison)
    }

    /// Add a constraint on a path.
    pub fn with(mut self, path: impl Into<String>, comparison: Comparison) -> Self {
        self.fields.entry(path.into()).or_default().push(comparison);
        self
    }

    /// Whether this query constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.and.is_empty() && self.or.is_empty()
    }

    /// Conjoin queries. Empty parts are dropped and a single survivor is
    /// returned unwrapped.
    pub fn all_of(parts: Vec<NativeQuery>) -> Self {
        let mut parts: Vec<_> = parts.into_iter().filter(|q| !q.is_empty()).collect();
        match parts.len() {
            0 => Self::new(),
            1 => parts.pop().unwrap_or_default(),
            _ => Self {
                and: parts,
                ..Self::default()
            },
        }
    }

    /// Disjoin queries. Empty parts are dropped and a single survivor is
    /// returned unwrapped.
    pub fn any_of(parts: Vec<NativeQuery>) -> Self {
        let mut parts: Vec<_> = parts.into_iter().filter(|q| !q.is_empty()).collect();
        match parts.len() {
            0 => Self::new(),
            1 => parts.pop().unwrap_or_default(),
            _ => Self {
                or: parts,
                ..Self::default()
            },
        }
    }

    /// Merge another query into this one so both sets of constraints hold.
    pub fn merge(mut self, other: NativeQuery) -> Self {
        for (path, comparisons) in other.fields {
            self.fields.entry(path).or_default().extend(comparisons);
        }
        self.and.extend(other.and);
        if self.or.is_empty() {
            self.or = other.or;
        } else if !other.or.is_empty() {
            self.and.push(NativeQuery {
                or: other.or,
                ..NativeQuery::default()
            });
        }
        self
    }

    /// Render as a Mongo-style filter document.
    ///
    /// Comparisons that cannot share an operator object with earlier ones on
    /// the same path (a repeated operator, or a raw value next to operators)
    /// are emitted as extra `$and` entries.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        let mut and: Vec<Value> = self.and.iter().map(NativeQuery::to_json).collect();

        for (path, comparisons) in &self.fields {
            let mut ops = Map::new();
            let mut raw: Option<Value> = None;

            for comparison in comparisons {
                match comparison {
                    Comparison::Op { op, value } => {
                        if raw.is_some() || ops.contains_key(op.as_str()) {
                            and.push(single(path, operator_object(*op, value.clone())));
                        } else {
                            ops.insert(op.as_str().to_string(), value.clone());
                        }
                    }
                    Comparison::Regex { pattern, options } => {
                        let body = regex_object(pattern, options);
                        if raw.is_some() || ops.contains_key("$regex") {
                            and.push(single(path, body));
                        } else if let Value::Object(body) = body {
                            ops.extend(body);
                        }
                    }
                    Comparison::ElemMatch(query) => {
                        if raw.is_some() || ops.contains_key("$elemMatch") {
                            and.push(single(path, single("$elemMatch", query.to_json())));
                        } else {
                            ops.insert("$elemMatch".to_string(), query.to_json());
                        }
                    }
                    Comparison::Raw(value) => {
                        if raw.is_some() || !ops.is_empty() {
                            and.push(single(path, value.clone()));
                        } else {
                            raw = Some(value.clone());
                        }
                    }
                }
            }

            let rendered = match raw {
                Some(value) => value,
                None => Value::Object(ops),
            };
            doc.insert(path.clone(), rendered);
        }

        if !and.is_empty() {
            doc.insert("$and".to_string(), Value::Array(and));
        }
        if !self.or.is_empty() {
            doc.insert(
                "$or".to_string(),
                Value::Array(self.or.iter().map(NativeQuery::to_json).collect()),
            );
        }
        Value::Object(doc)
    }
}

impl Serialize for NativeQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn single(path: &str, body: Value) -> Value {
    let mut doc = Map::new();
    doc.insert(path.to_string(), body);
    Value::Object(doc)
}

fn operator_object(op: NativeOp, value: Value) -> Value {
    let mut body = Map::new();
    body.insert(op.as_str().to_string(), value);
    Value::Object(body)
}

fn regex_object(pattern: &str, options: &str) -> Value {
    let mut body = Map::new();
    body.insert("$regex".to_string(), Value::String(pattern.to_string()));
    body.insert("$options".to_string(), Value::String(options.to_string()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_path_renders_operator_object() {
        let q = NativeQuery::path("title", Comparison::op(NativeOp::Eq, "Hello"));
        assert_eq!(q.to_json(), json!({ "title": { "$eq": "Hello" } }));
    }

    #[test]
    fn test_range_merges_into_one_object() {
        let q = NativeQuery::path("age", Comparison::op(NativeOp::Gt, 10))
            .merge(NativeQuery::path("age", Comparison::op(NativeOp::Lt, 20)));
        assert_eq!(q.to_json(), json!({ "age": { "$gt": 10, "$lt": 20 } }));
    }

    #[test]
    fn test_repeated_operator_survives() {
        let q = NativeQuery::path("title", Comparison::op(NativeOp::Ne, "A"))
            .merge(NativeQuery::path("title", Comparison::op(NativeOp::Ne, "B")));
        assert_eq!(
            q.to_json(),
            json!({
                "title": { "$ne": "A" },
                "$and": [{ "title": { "$ne": "B" } }]
            })
        );
    }

    #[test]
    fn test_regex_renders_options() {
        let q = NativeQuery::path("title", Comparison::regex("rust"));
        assert_eq!(
            q.to_json(),
            json!({ "title": { "$regex": "rust", "$options": "i" } })
        );
    }

    #[test]
    fn test_two_disjunctions_are_conjoined() {
        let a = NativeQuery::any_of(vec![
            NativeQuery::path("a", Comparison::op(NativeOp::Eq, 1)),
            NativeQuery::path("a", Comparison::op(NativeOp::Eq, "1")),
        ]);
        let b = NativeQuery::any_of(vec![
            NativeQuery::path("b", Comparison::op(NativeOp::Eq, 2)),
            NativeQuery::path("b", Comparison::op(NativeOp::Eq, "2")),
        ]);
        let merged = a.clone().merge(b.clone());
        assert_eq!(merged.or, a.or);
        assert_eq!(merged.and.len(), 1);
        assert_eq!(merged.and[0].or, b.or);
    }

    #[test]
    fn test_singleton_groups_unwrap() {
        let leaf = NativeQuery::path("x", Comparison::op(NativeOp::Exists, true));
        assert_eq!(NativeQuery::all_of(vec![leaf.clone()]), leaf);
        assert_eq!(
            NativeQuery::any_of(vec![NativeQuery::new(), leaf.clone()]),
            leaf
        );
        assert!(NativeQuery::all_of(vec![NativeQuery::new()]).is_empty());
    }

    #[test]
    fn test_elem_match_renders_nested_query() {
        let element = NativeQuery::path("relationTo", Comparison::op(NativeOp::Eq, "users"))
            .with("value", Comparison::op(NativeOp::In, json!(["a"])));
        let q = NativeQuery::path("owners", Comparison::elem_match(element));
        assert_eq!(
            q.to_json(),
            json!({
                "owners": {
                    "$elemMatch": {
                        "relationTo": { "$eq": "users" },
                        "value": { "$in": ["a"] }
                    }
                }
            })
        );
    }

    #[test]
    fn test_raw_value_is_verbatim() {
        let geo = json!({ "$near": { "$geometry": { "type": "Point", "coordinates": [1.0, 2.0] } } });
        let q = NativeQuery::path("location", Comparison::Raw(geo.clone()));
        assert_eq!(q.to_json(), json!({ "location": geo }));
    }
}
