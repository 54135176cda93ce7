//! Operator translation.
//!
//! Maps a client operator and raw value to a native constraint on a stored
//! path, coercing the value for the kind of field it targets.

use serde_json::{json, Map, Number, Value};
use vellum_proto::{Comparison, NativeOp, NativeQuery, Operator};

use crate::catalog::{IdType, LeafKind};

/// Value representation of the field a condition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// The document identifier.
    Id(IdType),
    /// A stored reference to another document.
    Reference,
    Number,
    Checkbox,
    Point,
    /// Anything without special coercion.
    Other,
}

impl ValueKind {
    /// Value kind of a leaf.
    pub fn from_leaf(kind: LeafKind) -> Self {
        match kind {
            LeafKind::Id(id_type) => ValueKind::Id(id_type),
            LeafKind::Reference => ValueKind::Reference,
            LeafKind::Number => ValueKind::Number,
            LeafKind::Checkbox => ValueKind::Checkbox,
            LeafKind::Point => ValueKind::Point,
            _ => ValueKind::Other,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Number | ValueKind::Id(IdType::Number))
    }
}

/// Native operator for a comparison operator. Regex and geo operators have
/// no plain operator and return `None`.
pub fn native_op(operator: Operator) -> Option<NativeOp> {
    let op = match operator {
        Operator::Equals => NativeOp::Eq,
        Operator::NotEquals => NativeOp::Ne,
        Operator::In => NativeOp::In,
        Operator::NotIn => NativeOp::Nin,
        Operator::All => NativeOp::All,
        Operator::Exists => NativeOp::Exists,
        Operator::GreaterThan => NativeOp::Gt,
        Operator::GreaterThanEqual => NativeOp::Gte,
        Operator::LessThan => NativeOp::Lt,
        Operator::LessThanEqual => NativeOp::Lte,
        Operator::Like | Operator::Contains | Operator::Near => return None,
    };
    Some(op)
}

/// Translate one condition into a native query on `path`.
///
/// Returns `None` when the value can never match the field (an identifier in
/// the wrong format); the caller drops the condition.
pub fn translate(path: &str, operator: Operator, value: &Value, kind: ValueKind) -> Option<NativeQuery> {
    let value = coerce(operator, value, kind)?;

    let query = match operator {
        Operator::Near => NativeQuery::path(path, Comparison::Raw(value)),
        Operator::Like => NativeQuery::path(path, Comparison::regex(like_pattern(&value))),
        Operator::Contains => {
            NativeQuery::path(path, Comparison::regex(regex::escape(&as_text(&value))))
        }
        _ => {
            let op = native_op(operator)?;
            if kind == ValueKind::Reference {
                reference_query(path, op, value)
            } else {
                NativeQuery::path(path, Comparison::op(op, value))
            }
        }
    };
    Some(query)
}

/// Check for a 24 character hex object identifier.
pub fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn coerce(operator: Operator, value: &Value, kind: ValueKind) -> Option<Value> {
    if let (ValueKind::Id(id_type), Value::String(s)) = (kind, value) {
        if !s.contains(',') {
            match id_type {
                IdType::ObjectId if !is_object_id(s) => return None,
                IdType::Number if numeric(s).is_none() => return None,
                _ => {}
            }
        }
    }

    match operator {
        Operator::Exists => {
            let exists = matches!(value, Value::Bool(true)) || value.as_str() == Some("true");
            return Some(Value::Bool(exists));
        }
        Operator::Near => {
            return match (kind, value) {
                (ValueKind::Point, Value::String(s)) => near_query(s),
                _ => Some(value.clone()),
            };
        }
        _ => {}
    }

    let mut value = value.clone();

    if kind == ValueKind::Checkbox {
        if let Value::String(s) = &value {
            if s.eq_ignore_ascii_case("true") {
                value = Value::Bool(true);
            } else if s.eq_ignore_ascii_case("false") {
                value = Value::Bool(false);
            }
        }
    }

    if kind == ValueKind::Reference && value.as_str() == Some("null") {
        value = Value::Null;
    }

    if operator.takes_list() {
        if let Value::String(s) = &value {
            value = Value::Array(
                s.split(',')
                    .map(|part| Value::String(part.trim().to_string()))
                    .collect(),
            );
        }
    }

    if kind.is_numeric() {
        value = match value {
            Value::String(s) => numeric(&s).unwrap_or(Value::String(s)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => numeric(&s).unwrap_or(Value::String(s)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        };
    }

    Some(value)
}

/// Parse a numeric string into a JSON number, preferring integers.
fn numeric(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_coordinate(part: Option<&str>) -> Option<f64> {
    part.map(str::trim)
        .filter(|p| !p.is_empty())
        .and_then(|p| p.parse::<f64>().ok())
        .filter(|f| f.is_finite())
}

/// Parse `"lng,lat[,maxDistance[,minDistance]]"` into a `$near` document.
fn near_query(s: &str) -> Option<Value> {
    let mut parts = s.split(',');
    let lng = parse_coordinate(parts.next())?;
    let lat = parse_coordinate(parts.next())?;
    let max_distance = parse_coordinate(parts.next());
    let min_distance = parse_coordinate(parts.next());

    let mut near = Map::new();
    near.insert(
        "$geometry".to_string(),
        json!({ "type": "Point", "coordinates": [lng, lat] }),
    );
    if let Some(max) = max_distance {
        near.insert("$maxDistance".to_string(), json!(max));
    }
    if let Some(min) = min_distance {
        near.insert("$minDistance".to_string(), json!(min));
    }
    Some(json!({ "$near": Value::Object(near) }))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Every word must appear, in order, case-insensitively.
fn like_pattern(value: &Value) -> String {
    as_text(value)
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

/// Representations a stored reference may take: as given, as string, as
/// number, and as native object identifier.
fn representations(value: &Value) -> Vec<Value> {
    let mut reps = vec![value.clone()];
    match value {
        Value::Number(n) => reps.push(Value::String(n.to_string())),
        Value::String(s) => {
            if let Some(n) = numeric(s) {
                reps.push(n);
            }
            if is_object_id(s) {
                reps.push(json!({ "$oid": s }));
            }
        }
        _ => {}
    }
    reps.dedup();
    reps
}

fn reference_query(path: &str, op: NativeOp, value: Value) -> NativeQuery {
    match (op, &value) {
        (NativeOp::In | NativeOp::Nin, Value::Array(items)) => {
            let mut expanded: Vec<Value> = Vec::new();
            for item in items {
                for rep in representations(item) {
                    if !expanded.contains(&rep) {
                        expanded.push(rep);
                    }
                }
            }
            NativeQuery::path(path, Comparison::op(op, Value::Array(expanded)))
        }
        // A disjunction of `$ne` would match everything.
        (NativeOp::Ne, v) if !v.is_array() => {
            NativeQuery::path(path, Comparison::op(NativeOp::Nin, Value::Array(representations(v))))
        }
        (NativeOp::Eq | NativeOp::Gt | NativeOp::Gte | NativeOp::Lt | NativeOp::Lte, v)
            if !v.is_array() =>
        {
            NativeQuery::any_of(
                representations(v)
                    .into_iter()
                    .map(|rep| NativeQuery::path(path, Comparison::op(op, rep)))
                    .collect(),
            )
        }
        _ => NativeQuery::path(path, Comparison::op(op, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(path: &str, operator: Operator, value: Value, kind: ValueKind) -> Option<Value> {
        translate(path, operator, &value, kind).map(|q| q.to_json())
    }

    #[test]
    fn test_operator_map() {
        assert_eq!(native_op(Operator::Equals), Some(NativeOp::Eq));
        assert_eq!(native_op(Operator::NotIn), Some(NativeOp::Nin));
        assert_eq!(native_op(Operator::GreaterThanEqual), Some(NativeOp::Gte));
        assert_eq!(native_op(Operator::Like), None);
        assert_eq!(
            render("age", Operator::LessThan, json!(20), ValueKind::Number),
            Some(json!({ "age": { "$lt": 20 } }))
        );
    }

    #[test]
    fn test_invalid_object_id_drops_condition() {
        let kind = ValueKind::Id(IdType::ObjectId);
        assert_eq!(render("_id", Operator::Equals, json!("nope"), kind), None);
        assert_eq!(
            render("_id", Operator::Equals, json!("64b7f0c2a1b2c3d4e5f60001"), kind),
            Some(json!({ "_id": { "$eq": "64b7f0c2a1b2c3d4e5f60001" } }))
        );
        // Comma lists are not validated as a single identifier.
        assert!(render("_id", Operator::In, json!("a,b"), kind).is_some());
    }

    #[test]
    fn test_numeric_ids() {
        let kind = ValueKind::Id(IdType::Number);
        assert_eq!(render("_id", Operator::Equals, json!("abc"), kind), None);
        assert_eq!(
            render("_id", Operator::Equals, json!("42"), kind),
            Some(json!({ "_id": { "$eq": 42 } }))
        );
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(
            render("published", Operator::Equals, json!("TRUE"), ValueKind::Checkbox),
            Some(json!({ "published": { "$eq": true } }))
        );
        assert_eq!(
            render("views", Operator::GreaterThan, json!("10.5"), ValueKind::Number),
            Some(json!({ "views": { "$gt": 10.5 } }))
        );
        assert_eq!(
            render("views", Operator::In, json!("1, 2,x"), ValueKind::Number),
            Some(json!({ "views": { "$in": [1, 2, "x"] } }))
        );
        assert_eq!(
            render("tags", Operator::All, json!("a,b"), ValueKind::Other),
            Some(json!({ "tags": { "$all": ["a", "b"] } }))
        );
        assert_eq!(
            render("title", Operator::Exists, json!("true"), ValueKind::Other),
            Some(json!({ "title": { "$exists": true } }))
        );
        assert_eq!(
            render("title", Operator::Exists, json!("yes"), ValueKind::Other),
            Some(json!({ "title": { "$exists": false } }))
        );
    }

    #[test]
    fn test_like_and_contains_escape() {
        assert_eq!(
            render("title", Operator::Contains, json!("a+b"), ValueKind::Other),
            Some(json!({ "title": { "$regex": "a\\+b", "$options": "i" } }))
        );
        assert_eq!(
            render("title", Operator::Like, json!("hello  (world)"), ValueKind::Other),
            Some(json!({ "title": { "$regex": "hello.*\\(world\\)", "$options": "i" } }))
        );
    }

    #[test]
    fn test_near_point_string() {
        assert_eq!(
            render("location", Operator::Near, json!("10,20,5000"), ValueKind::Point),
            Some(json!({
                "location": {
                    "$near": {
                        "$geometry": { "type": "Point", "coordinates": [10.0, 20.0] },
                        "$maxDistance": 5000.0
                    }
                }
            }))
        );
        assert_eq!(render("location", Operator::Near, json!("x,1"), ValueKind::Point), None);

        let shaped = json!({ "$near": { "$geometry": { "type": "Point", "coordinates": [1, 2] } } });
        assert_eq!(
            render("location", Operator::Near, shaped.clone(), ValueKind::Other),
            Some(json!({ "location": shaped }))
        );
    }

    #[test]
    fn test_reference_representations() {
        let id = "64b7f0c2a1b2c3d4e5f60001";
        assert_eq!(
            render("author", Operator::Equals, json!(id), ValueKind::Reference),
            Some(json!({ "$or": [
                { "author": { "$eq": id } },
                { "author": { "$eq": { "$oid": id } } }
            ] }))
        );
        assert_eq!(
            render("author", Operator::Equals, json!(7), ValueKind::Reference),
            Some(json!({ "$or": [
                { "author": { "$eq": 7 } },
                { "author": { "$eq": "7" } }
            ] }))
        );
        assert_eq!(
            render("author", Operator::Equals, json!("null"), ValueKind::Reference),
            Some(json!({ "author": { "$eq": null } }))
        );
        assert_eq!(
            render("author", Operator::NotEquals, json!("12"), ValueKind::Reference),
            Some(json!({ "author": { "$nin": ["12", 12] } }))
        );
        assert_eq!(
            render("author", Operator::In, json!("3,slug"), ValueKind::Reference),
            Some(json!({ "author": { "$in": ["3", 3, "slug"] } }))
        );
    }
}
