//! Conversion of filter expressions into backend-native filter languages.
//!
//! Backend adapters that push filtering down to an external database
//! implement [`FilterExpressionConverter`] for their query dialect.

use super::parser::{is_identifier_char, is_identifier_start, is_keyword};
use super::{ComparisonOp, FilterExpression, LogicalOp};
use crate::document::MetadataValue;

/// Converts a [`FilterExpression`] into a backend-native filter string.
pub trait FilterExpressionConverter {
    fn convert(&self, expr: &FilterExpression) -> String;
}

/// Renders expressions in the crate's own textual grammar.
///
/// The output parses back to an identical tree, except for non-finite float
/// literals, which have no textual form.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFilterConverter;

impl FilterExpressionConverter for TextFilterConverter {
    fn convert(&self, expr: &FilterExpression) -> String {
        let mut out = String::new();
        render_text(expr, &mut out);
        out
    }
}

fn render_text(expr: &FilterExpression, out: &mut String) {
    match expr {
        FilterExpression::Comparison { key, op, value } => {
            push_key(key, out);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            push_literal(value, out);
        }
        FilterExpression::In { key, values } => push_membership(key, "IN", values, out),
        FilterExpression::NotIn { key, values } => push_membership(key, "NIN", values, out),
        FilterExpression::Not { child } => {
            out.push_str("NOT ");
            push_operand(child, matches!(**child, FilterExpression::Logical { .. }), out);
        }
        FilterExpression::Logical { op, left, right } => {
            // Left-nested chains of the same operator read without parentheses;
            // anything else that would re-associate is grouped.
            let (left_group, right_group) = match op {
                LogicalOp::And => (
                    matches!(**left, FilterExpression::Logical { op: LogicalOp::Or, .. }),
                    matches!(**right, FilterExpression::Logical { .. }),
                ),
                LogicalOp::Or => {
                    (false, matches!(**right, FilterExpression::Logical { op: LogicalOp::Or, .. }))
                }
            };
            push_operand(left, left_group, out);
            out.push(' ');
            out.push_str(op.keyword());
            out.push(' ');
            push_operand(right, right_group, out);
        }
    }
}

fn push_operand(expr: &FilterExpression, grouped: bool, out: &mut String) {
    if grouped {
        out.push('(');
        render_text(expr, out);
        out.push(')');
    } else {
        render_text(expr, out);
    }
}

fn push_membership(key: &str, keyword: &str, values: &[MetadataValue], out: &mut String) {
    push_key(key, out);
    out.push(' ');
    out.push_str(keyword);
    out.push_str(" [");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_literal(value, out);
    }
    out.push(']');
}

fn push_key(key: &str, out: &mut String) {
    let mut chars = key.chars();
    let bare = chars.next().is_some_and(is_identifier_start)
        && chars.all(is_identifier_char)
        && !is_keyword(key);
    if bare {
        out.push_str(key);
    } else {
        push_quoted(key, out);
    }
}

fn push_quoted(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn push_literal(value: &MetadataValue, out: &mut String) {
    match value {
        MetadataValue::String(s) => push_quoted(s, out),
        MetadataValue::Integer(i) => out.push_str(&i.to_string()),
        // Debug keeps the fractional part (`2.0`), so floats stay floats.
        MetadataValue::Float(f) => out.push_str(&format!("{f:?}")),
        MetadataValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
    }
}

/// Renders expressions as a PostgreSQL `WHERE` fragment over a JSONB
/// metadata column, for pgvector-style tables.
///
/// Every leaf is guarded by `jsonb_typeof`, so missing keys and type
/// mismatches evaluate to `FALSE` exactly as in-process evaluation does.
/// The column name is inserted verbatim and must be a trusted identifier.
#[derive(Debug, Clone)]
pub struct PgJsonbFilterConverter {
    column: String,
}

impl Default for PgJsonbFilterConverter {
    fn default() -> Self {
        Self::new("metadata")
    }
}

impl PgJsonbFilterConverter {
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into() }
    }

    fn render(&self, expr: &FilterExpression) -> String {
        match expr {
            FilterExpression::Comparison { key, op, value } => self.comparison(key, *op, value),
            FilterExpression::Logical { op, left, right } => {
                format!("({} {} {})", self.render(left), op.keyword(), self.render(right))
            }
            FilterExpression::Not { child } => format!("NOT ({})", self.render(child)),
            FilterExpression::In { key, values } => self.any_equal(key, values),
            FilterExpression::NotIn { key, values } => {
                let present = format!("{}->{} IS NOT NULL", self.column, sql_string(key));
                if values.is_empty() {
                    present
                } else {
                    format!("({present} AND NOT {})", self.any_equal(key, values))
                }
            }
        }
    }

    fn any_equal(&self, key: &str, values: &[MetadataValue]) -> String {
        if values.is_empty() {
            return "FALSE".to_string();
        }
        let terms: Vec<String> =
            values.iter().map(|v| self.comparison(key, ComparisonOp::Eq, v)).collect();
        format!("({})", terms.join(" OR "))
    }

    fn comparison(&self, key: &str, op: ComparisonOp, value: &MetadataValue) -> String {
        let col = &self.column;
        let k = sql_string(key);
        let sql_op = match op {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        };
        let (json_type, lhs, rhs) = match value {
            MetadataValue::String(s) => {
                ("string", format!("{col}->>{k} COLLATE \"C\""), sql_string(s))
            }
            MetadataValue::Integer(i) => {
                ("number", format!("({col}->>{k})::numeric"), i.to_string())
            }
            MetadataValue::Float(f) if f.is_finite() => {
                ("number", format!("({col}->>{k})::numeric"), format!("{f:?}"))
            }
            MetadataValue::Float(_) => return "FALSE".to_string(),
            MetadataValue::Boolean(b) => {
                if !matches!(op, ComparisonOp::Eq | ComparisonOp::Ne) {
                    return "FALSE".to_string();
                }
                ("boolean", format!("({col}->>{k})::boolean"), b.to_string().to_uppercase())
            }
        };
        format!(
            "CASE WHEN jsonb_typeof({col}->{k}) = '{json_type}' \
             THEN {lhs} {sql_op} {rhs} ELSE FALSE END"
        )
    }
}

impl FilterExpressionConverter for PgJsonbFilterConverter {
    fn convert(&self, expr: &FilterExpression) -> String {
        self.render(expr)
    }
}

fn sql_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
