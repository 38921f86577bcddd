//! Metadata filter expressions.
//!
//! A [`FilterExpression`] is a boolean predicate over a document's
//! [`Metadata`](crate::Metadata). Expressions come from two equivalent
//! sources that produce identical trees:
//!
//! - the textual grammar, via [`FilterExpression::parse`]:
//!   `genre == 'drama' && year >= 2020`
//! - the fluent builder functions in [`builder`]:
//!   `eq("genre", "drama").and(gte("year", 2020))`
//!
//! Evaluation is total: missing keys and type mismatches make a predicate
//! `false` instead of failing.

pub mod builder;
mod converter;
mod eval;
mod parser;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, MetadataValue};

pub use builder::{eq, gt, gte, is_in, lt, lte, ne, not_in};
pub use converter::{FilterExpressionConverter, PgJsonbFilterConverter, TextFilterConverter};
pub use parser::ParseError;

/// Comparison operator of a [`FilterExpression::Comparison`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    /// The operator's symbol in the textual grammar.
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        }
    }
}

/// Boolean combinator of a [`FilterExpression::Logical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// A boolean predicate tree over document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterExpression {
    /// `key <op> value`.
    Comparison { key: String, op: ComparisonOp, value: MetadataValue },
    /// `left AND right` / `left OR right`.
    Logical { op: LogicalOp, left: Box<FilterExpression>, right: Box<FilterExpression> },
    /// `NOT child`.
    Not { child: Box<FilterExpression> },
    /// `key IN [values]`.
    In { key: String, values: Vec<MetadataValue> },
    /// `key NIN [values]`.
    NotIn { key: String, values: Vec<MetadataValue> },
}

impl FilterExpression {
    /// Parse the textual filter grammar.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] carrying the byte offset of the offending token.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse(text)
    }

    /// Evaluate this expression against a document's metadata.
    pub fn evaluate(&self, metadata: &Metadata) -> bool {
        eval::evaluate(self, metadata)
    }

    /// All metadata keys referenced by this expression, in first-use order.
    pub fn keys(&self) -> Vec<&str> {
        fn collect<'a>(expr: &'a FilterExpression, out: &mut Vec<&'a str>) {
            match expr {
                FilterExpression::Comparison { key, .. }
                | FilterExpression::In { key, .. }
                | FilterExpression::NotIn { key, .. } => {
                    if !out.contains(&key.as_str()) {
                        out.push(key);
                    }
                }
                FilterExpression::Logical { left, right, .. } => {
                    collect(left, out);
                    collect(right, out);
                }
                FilterExpression::Not { child } => collect(child, out),
            }
        }
        let mut keys = Vec::new();
        collect(self, &mut keys);
        keys
    }
}

impl FromStr for FilterExpression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Renders the canonical textual form, which parses back to the same tree.
impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&TextFilterConverter.convert(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deduplicated_in_order() {
        let expr = FilterExpression::parse("b == 1 AND (a > 2 OR b < 0) AND NOT c IN [1]").unwrap();
        assert_eq!(expr.keys(), vec!["b", "a", "c"]);
    }

    #[test]
    fn serde_shape_is_tagged() {
        let expr = eq("genre", "drama");
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "comparison", "key": "genre", "op": "eq", "value": "drama"})
        );
        let back: FilterExpression = serde_json::from_value(json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn from_str_matches_parse() {
        let expr: FilterExpression = "country == 'BG'".parse().unwrap();
        assert_eq!(expr, eq("country", "BG"));
    }
}
