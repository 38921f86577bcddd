//! Fluent construction of [`FilterExpression`]s.
//!
//! Every function returns a new expression value; combinators consume their
//! operands and return the combined tree, identical to what the parser
//! produces for the equivalent text.
//!
//! ```rust
//! use ragstore::filter::{FilterExpression, eq, gte, is_in};
//!
//! let built = eq("genre", "drama").and(gte("year", 2020));
//! let parsed = FilterExpression::parse("genre == 'drama' && year >= 2020").unwrap();
//! assert_eq!(built, parsed);
//!
//! let any_of = is_in("genre", ["comedy", "documentary", "drama"]);
//! assert_eq!(any_of.to_string(), "genre IN ['comedy', 'documentary', 'drama']");
//! ```

use std::ops;

use super::{ComparisonOp, FilterExpression, LogicalOp};
use crate::document::MetadataValue;

fn comparison(
    key: impl Into<String>,
    op: ComparisonOp,
    value: impl Into<MetadataValue>,
) -> FilterExpression {
    FilterExpression::Comparison { key: key.into(), op, value: value.into() }
}

/// `key == value`
pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> FilterExpression {
    comparison(key, ComparisonOp::Eq, value)
}

/// `key != value`
pub fn ne(key: impl Into<String>, value: impl Into<MetadataValue>) -> FilterExpression {
    comparison(key, ComparisonOp::Ne, value)
}

/// `key > value`
pub fn gt(key: impl Into<String>, value: impl Into<MetadataValue>) -> FilterExpression {
    comparison(key, ComparisonOp::Gt, value)
}

/// `key >= value`
pub fn gte(key: impl Into<String>, value: impl Into<MetadataValue>) -> FilterExpression {
    comparison(key, ComparisonOp::Gte, value)
}

/// `key < value`
pub fn lt(key: impl Into<String>, value: impl Into<MetadataValue>) -> FilterExpression {
    comparison(key, ComparisonOp::Lt, value)
}

/// `key <= value`
pub fn lte(key: impl Into<String>, value: impl Into<MetadataValue>) -> FilterExpression {
    comparison(key, ComparisonOp::Lte, value)
}

/// `key IN [values]`
pub fn is_in<I, V>(key: impl Into<String>, values: I) -> FilterExpression
where
    I: IntoIterator<Item = V>,
    V: Into<MetadataValue>,
{
    FilterExpression::In { key: key.into(), values: values.into_iter().map(Into::into).collect() }
}

/// `key NIN [values]`
pub fn not_in<I, V>(key: impl Into<String>, values: I) -> FilterExpression
where
    I: IntoIterator<Item = V>,
    V: Into<MetadataValue>,
{
    FilterExpression::NotIn {
        key: key.into(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

impl FilterExpression {
    /// `self AND other`
    pub fn and(self, other: FilterExpression) -> FilterExpression {
        FilterExpression::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self OR other`
    pub fn or(self, other: FilterExpression) -> FilterExpression {
        FilterExpression::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `NOT self`
    pub fn negate(self) -> FilterExpression {
        FilterExpression::Not { child: Box::new(self) }
    }
}

impl ops::Not for FilterExpression {
    type Output = FilterExpression;

    fn not(self) -> FilterExpression {
        self.negate()
    }
}

impl ops::BitAnd for FilterExpression {
    type Output = FilterExpression;

    fn bitand(self, rhs: FilterExpression) -> FilterExpression {
        self.and(rhs)
    }
}

impl ops::BitOr for FilterExpression {
    type Output = FilterExpression;

    fn bitor(self, rhs: FilterExpression) -> FilterExpression {
        self.or(rhs)
    }
}
