//! Filter operators accepted from clients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A comparison operator as written in a client `where` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    All,
    Exists,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Like,
    Contains,
    Near,
}

impl Operator {
    /// Every supported operator, in the order clients usually see them documented.
    pub const ALL: [Operator; 13] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::In,
        Operator::NotIn,
        Operator::All,
        Operator::Exists,
        Operator::GreaterThan,
        Operator::GreaterThanEqual,
        Operator::LessThan,
        Operator::LessThanEqual,
        Operator::Like,
        Operator::Contains,
        Operator::Near,
    ];

    /// Parse an operator name, returning `None` for anything unsupported.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    /// The client-facing name of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::All => "all",
            Operator::Exists => "exists",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanEqual => "greater_than_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanEqual => "less_than_equal",
            Operator::Like => "like",
            Operator::Contains => "contains",
            Operator::Near => "near",
        }
    }

    /// Operators whose value takes a list (comma-delimited strings are split).
    pub fn takes_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn | Operator::All)
    }

    /// Geo operators that may address an unlocalized path on a localized field.
    pub fn is_geo(&self) -> bool {
        matches!(self, Operator::Near)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidOperator(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_operators() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_reject_unknown_operator() {
        assert_eq!(Operator::parse("regex"), None);
        assert_eq!(
            "$where".parse::<Operator>(),
            Err(Error::InvalidOperator("$where".to_string()))
        );
    }

    #[test]
    fn test_list_operators() {
        assert!(Operator::In.takes_list());
        assert!(Operator::All.takes_list());
        assert!(!Operator::Equals.takes_list());
        assert!(Operator::Near.is_geo());
    }
}
