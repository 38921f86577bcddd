//! Total evaluation of filter expressions against metadata.

use std::cmp::Ordering;

use super::{ComparisonOp, FilterExpression, LogicalOp};
use crate::document::{Metadata, MetadataValue};

pub(super) fn evaluate(expr: &FilterExpression, metadata: &Metadata) -> bool {
    match expr {
        FilterExpression::Comparison { key, op, value } => {
            metadata.get(key).is_some_and(|field| compare(*op, field, value))
        }
        FilterExpression::Logical { op: LogicalOp::And, left, right } => {
            evaluate(left, metadata) && evaluate(right, metadata)
        }
        FilterExpression::Logical { op: LogicalOp::Or, left, right } => {
            evaluate(left, metadata) || evaluate(right, metadata)
        }
        FilterExpression::Not { child } => !evaluate(child, metadata),
        FilterExpression::In { key, values } => {
            metadata.get(key).is_some_and(|field| values.iter().any(|v| equals(field, v)))
        }
        FilterExpression::NotIn { key, values } => {
            metadata.get(key).is_some_and(|field| !values.iter().any(|v| equals(field, v)))
        }
    }
}

/// Ordering between two values of compatible types, `None` otherwise.
///
/// Integers and floats are mutually comparable; strings compare
/// lexicographically; booleans only with booleans.
fn ordering(field: &MetadataValue, value: &MetadataValue) -> Option<Ordering> {
    match (field, value) {
        (MetadataValue::Integer(a), MetadataValue::Integer(b)) => Some(a.cmp(b)),
        (MetadataValue::String(a), MetadataValue::String(b)) => Some(a.cmp(b)),
        (MetadataValue::Boolean(a), MetadataValue::Boolean(b)) => Some(a.cmp(b)),
        _ => field.as_f64()?.partial_cmp(&value.as_f64()?),
    }
}

fn equals(field: &MetadataValue, value: &MetadataValue) -> bool {
    ordering(field, value) == Some(Ordering::Equal)
}

fn compare(op: ComparisonOp, field: &MetadataValue, value: &MetadataValue) -> bool {
    let Some(ord) = ordering(field, value) else {
        return false;
    };
    let is_bool = matches!(field, MetadataValue::Boolean(_));
    match op {
        ComparisonOp::Eq => ord == Ordering::Equal,
        ComparisonOp::Ne => ord != Ordering::Equal,
        // Booleans have no ordering in the grammar.
        _ if is_bool => false,
        ComparisonOp::Gt => ord == Ordering::Greater,
        ComparisonOp::Gte => ord != Ordering::Less,
        ComparisonOp::Lt => ord == Ordering::Less,
        ComparisonOp::Lte => ord != Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::builder::*;

    fn meta(pairs: Vec<(&str, MetadataValue)>) -> Metadata {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn movie() -> Metadata {
        meta(vec![
            ("genre", "drama".into()),
            ("year", 2021.into()),
            ("rating", 7.5.into()),
            ("released", true.into()),
        ])
    }

    #[test]
    fn comparisons_on_matching_types() {
        let m = movie();
        assert!(eq("genre", "drama").evaluate(&m));
        assert!(ne("genre", "comedy").evaluate(&m));
        assert!(gt("year", 2020).evaluate(&m));
        assert!(gte("year", 2021).evaluate(&m));
        assert!(!lt("year", 2021).evaluate(&m));
        assert!(lte("rating", 7.5).evaluate(&m));
        assert!(gt("genre", "comedy").evaluate(&m));
        assert!(eq("released", true).evaluate(&m));
        assert!(ne("released", false).evaluate(&m));
    }

    #[test]
    fn integers_and_floats_compare_numerically() {
        let m = movie();
        assert!(eq("year", 2021.0).evaluate(&m));
        assert!(gt("rating", 7).evaluate(&m));
        assert!(lt("rating", 8).evaluate(&m));
    }

    #[test]
    fn missing_key_is_false_for_every_predicate() {
        let m = movie();
        assert!(!eq("country", "BG").evaluate(&m));
        assert!(!ne("country", "BG").evaluate(&m));
        assert!(!gt("country", 1).evaluate(&m));
        assert!(!is_in("country", ["BG"]).evaluate(&m));
        assert!(!not_in("country", ["BG"]).evaluate(&m));
        // Negation of a false predicate is true.
        assert!(eq("country", "BG").negate().evaluate(&m));
    }

    #[test]
    fn type_mismatch_is_false() {
        let m = movie();
        assert!(!gte("genre", 5).evaluate(&m));
        assert!(!eq("genre", 5).evaluate(&m));
        assert!(!ne("genre", 5).evaluate(&m));
        assert!(!eq("year", "2021").evaluate(&m));
        assert!(!gt("released", false).evaluate(&m));
        assert!(!eq("released", 1).evaluate(&m));
    }

    #[test]
    fn membership() {
        let m = movie();
        assert!(is_in("genre", ["comedy", "documentary", "drama"]).evaluate(&m));
        assert!(!is_in("genre", ["comedy"]).evaluate(&m));
        assert!(is_in("year", [2019.0, 2021.0]).evaluate(&m));
        assert!(not_in("genre", ["comedy"]).evaluate(&m));
        assert!(!not_in("genre", ["drama"]).evaluate(&m));
        assert!(!is_in("genre", Vec::<MetadataValue>::new()).evaluate(&m));
    }

    #[test]
    fn logical_combinators() {
        let m = movie();
        assert!(eq("genre", "drama").and(gte("year", 2020)).evaluate(&m));
        assert!(!eq("genre", "drama").and(lt("year", 2020)).evaluate(&m));
        assert!(eq("genre", "comedy").or(gte("year", 2020)).evaluate(&m));
        assert!(!eq("genre", "comedy").or(lt("year", 2020)).evaluate(&m));
    }

    #[test]
    fn nan_never_matches() {
        let m = meta(vec![("score", f64::NAN.into())]);
        assert!(!eq("score", f64::NAN).evaluate(&m));
        assert!(!gt("score", 0).evaluate(&m));
        assert!(!ne("score", 1).evaluate(&m));
    }
}
