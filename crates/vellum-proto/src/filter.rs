//! Client filter trees.
//!
//! A `where` document is parsed permissively: `and`/`or` keys (any case) hold
//! arrays of nested `where` documents, every other key is a field path whose
//! body maps operator names to values. Shapes that do not fit are skipped so
//! they contribute nothing to the compiled query. Operator names are kept as
//! written; rejecting unknown ones is the compiler's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `operator: value` pair applied to a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// Operator name exactly as supplied (untrusted).
    pub operator: String,
    /// Raw, uncoerced value.
    pub value: Value,
}

impl Clause {
    /// Create a clause.
    pub fn new(operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// A node of a client filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    /// Every child must match.
    And(Vec<FilterNode>),
    /// At least one child must match.
    Or(Vec<FilterNode>),
    /// Comparisons against a single dotted path. Several clauses on the same
    /// path come from sibling operator keys and are all enforced.
    Condition {
        /// Dotted field path, possibly crossing relationships.
        path: String,
        /// Operator clauses, ordered by operator key.
        clauses: Vec<Clause>,
    },
}

impl FilterNode {
    /// Create a single-clause condition.
    pub fn condition(
        path: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        FilterNode::Condition {
            path: path.into(),
            clauses: vec![Clause::new(operator, value)],
        }
    }

    /// Create an AND node.
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::And(children)
    }

    /// Create an OR node.
    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Or(children)
    }

    /// Parse a `where` document.
    ///
    /// Anything other than an object yields an empty AND, which compiles to
    /// no constraint at all. A document with a single usable key yields that
    /// key's node directly; several keys are combined under an AND, visited
    /// in key order.
    pub fn from_where(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return FilterNode::And(Vec::new());
        };

        let mut nodes = Vec::with_capacity(object.len());
        for (key, body) in object {
            if key.eq_ignore_ascii_case("and") {
                if let Some(children) = Self::parse_children(body) {
                    nodes.push(FilterNode::And(children));
                }
            } else if key.eq_ignore_ascii_case("or") {
                if let Some(children) = Self::parse_children(body) {
                    nodes.push(FilterNode::Or(children));
                }
            } else if let Some(operators) = body.as_object() {
                let clauses = operators
                    .iter()
                    .map(|(operator, value)| Clause::new(operator.clone(), value.clone()))
                    .collect();
                nodes.push(FilterNode::Condition {
                    path: key.clone(),
                    clauses,
                });
            }
        }

        if nodes.len() == 1 {
            nodes.pop().unwrap_or(FilterNode::And(Vec::new()))
        } else {
            FilterNode::And(nodes)
        }
    }

    fn parse_children(body: &Value) -> Option<Vec<FilterNode>> {
        let items = body.as_array()?;
        Some(
            items
                .iter()
                .filter(|item| item.is_object())
                .map(Self::from_where)
                .collect(),
        )
    }

    /// Collect every path referenced by this tree.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a str>) {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                for child in children {
                    child.collect_paths(paths);
                }
            }
            FilterNode::Condition { path, .. } => paths.push(path.as_str()),
        }
    }

    /// Whether this node can contribute nothing (an empty AND/OR).
    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                children.iter().all(FilterNode::is_empty)
            }
            FilterNode::Condition { clauses, .. } => clauses.is_empty(),
        }
    }
}
