//! Tokenizer and recursive-descent parser for the filter grammar.
//!
//! ```text
//! expr      := or
//! or        := and ( ("OR" | "||") and )*
//! and       := unary ( ("AND" | "&&") unary )*
//! unary     := "NOT" unary | primary
//! primary   := "(" expr ")" | predicate
//! predicate := key ( cmp_op literal | "IN" list | "NIN" list | "NOT" "IN" list )
//! key       := identifier | string
//! list      := "[" ( literal ( "," literal )* )? "]"
//! literal   := string | integer | float | "true" | "false"
//! ```
//!
//! Keywords are case-insensitive.

use thiserror::Error;

use super::{ComparisonOp, FilterExpression, LogicalOp};
use crate::document::MetadataValue;

/// Nesting limit for parentheses and `NOT` chains.
const MAX_DEPTH: usize = 128;

/// Upper bound on comparisons and memberships in one expression.
const MAX_PREDICATES: usize = 1024;

/// A malformed filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Filter parse error at position {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the input where the problem was detected.
    pub position: usize,
    /// What was expected and what was found.
    pub message: String,
}

impl ParseError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Integer(i64),
    Float(f64),
    True,
    False,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
    Not,
    In,
    Nin,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Str(s) => format!("string '{s}'"),
            TokenKind::Integer(i) => format!("number {i}"),
            TokenKind::Float(f) => format!("number {f}"),
            TokenKind::True => "'true'".to_string(),
            TokenKind::False => "'false'".to_string(),
            TokenKind::Eq => "'=='".to_string(),
            TokenKind::Ne => "'!='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Gte => "'>='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Lte => "'<='".to_string(),
            TokenKind::And => "'AND'".to_string(),
            TokenKind::Or => "'OR'".to_string(),
            TokenKind::Not => "'NOT'".to_string(),
            TokenKind::In => "'IN'".to_string(),
            TokenKind::Nin => "'NIN'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

/// Whether `name` is a keyword of the grammar (case-insensitive).
pub(super) fn is_keyword(name: &str) -> bool {
    keyword(name).is_some()
}

fn keyword(name: &str) -> Option<TokenKind> {
    match name.to_ascii_lowercase().as_str() {
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "not" => Some(TokenKind::Not),
        "in" => Some(TokenKind::In),
        "nin" => Some(TokenKind::Nin),
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        _ => None,
    }
}

pub(super) fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(super) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.next_char();
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.next_char() else {
            return Ok(Token { kind: TokenKind::Eof, position: start });
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '=' => {
                if !self.eat('=') {
                    return Err(ParseError::new(start, "expected '==', found '='"));
                }
                TokenKind::Eq
            }
            '!' => {
                if !self.eat('=') {
                    return Err(ParseError::new(start, "expected '!=', found '!'"));
                }
                TokenKind::Ne
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Gte
                } else {
                    TokenKind::Gt
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::Lte
                } else {
                    TokenKind::Lt
                }
            }
            '&' => {
                if !self.eat('&') {
                    return Err(ParseError::new(start, "expected '&&', found '&'"));
                }
                TokenKind::And
            }
            '|' => {
                if !self.eat('|') {
                    return Err(ParseError::new(start, "expected '||', found '|'"));
                }
                TokenKind::Or
            }
            '\'' | '"' => TokenKind::Str(self.read_string(c, start)?),
            '-' | '+' => {
                if !self.peek_char().is_some_and(|n| n.is_ascii_digit()) {
                    return Err(ParseError::new(start, format!("expected a digit after '{c}'")));
                }
                self.read_number(start)?
            }
            _ if c.is_ascii_digit() => self.read_number(start)?,
            _ if is_identifier_start(c) => {
                while self.peek_char().is_some_and(is_identifier_char) {
                    self.next_char();
                }
                let word = &self.input[start..self.pos];
                keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
            }
            other => {
                return Err(ParseError::new(start, format!("unexpected character '{other}'")));
            }
        };

        Ok(Token { kind, position: start })
    }

    fn read_string(&mut self, quote: char, start: usize) -> Result<String, ParseError> {
        let mut s = String::new();
        loop {
            match self.next_char() {
                None => return Err(ParseError::new(start, "unterminated string literal")),
                Some(c) if c == quote => return Ok(s),
                Some('\\') => match self.next_char() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(escaped) => s.push(escaped),
                    None => return Err(ParseError::new(start, "unterminated string literal")),
                },
                Some(c) => s.push(c),
            }
        }
    }

    /// Reads a number whose first character (digit or sign) was already consumed.
    fn read_number(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut is_float = false;
        self.consume_digits();

        if self.peek_char() == Some('.') {
            is_float = true;
            self.next_char();
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ParseError::new(self.pos, "expected digits after decimal point"));
            }
            self.consume_digits();
        }

        if matches!(self.peek_char(), Some('e' | 'E')) {
            is_float = true;
            self.next_char();
            if !self.eat('+') {
                self.eat('-');
            }
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ParseError::new(self.pos, "expected digits in exponent"));
            }
            self.consume_digits();
        }

        if self.peek_char().is_some_and(is_identifier_start) {
            return Err(ParseError::new(self.pos, "unexpected character after number"));
        }

        let literal = &self.input[start..self.pos];
        if is_float {
            literal
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|e| ParseError::new(start, format!("invalid number '{literal}': {e}")))
        } else {
            literal
                .parse::<i64>()
                .map(TokenKind::Integer)
                .map_err(|e| ParseError::new(start, format!("invalid integer '{literal}': {e}")))
        }
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.next_char();
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
    predicates: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token list always ends with Eof and `advance` never moves past it.
        &self.tokens[self.index]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::new(
            token.position,
            format!("expected {expected}, found {}", token.kind.describe()),
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(self.peek().position, "expression nested too deeply"));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<FilterExpression, ParseError> {
        let mut left = self.parse_and()?;
        while self.peek().kind == TokenKind::Or {
            self.advance();
            let right = self.parse_and()?;
            left = FilterExpression::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpression, ParseError> {
        let mut left = self.parse_unary()?;
        while self.peek().kind == TokenKind::And {
            self.advance();
            let right = self.parse_unary()?;
            left = FilterExpression::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpression, ParseError> {
        if self.peek().kind == TokenKind::Not {
            self.advance();
            self.enter()?;
            let child = self.parse_unary()?;
            self.depth -= 1;
            return Ok(FilterExpression::Not { child: Box::new(child) });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpression, ParseError> {
        if self.peek().kind == TokenKind::LParen {
            self.advance();
            self.enter()?;
            let inner = self.parse_or()?;
            self.depth -= 1;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(inner);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<FilterExpression, ParseError> {
        self.predicates += 1;
        if self.predicates > MAX_PREDICATES {
            return Err(ParseError::new(
                self.peek().position,
                format!("expression too large: more than {MAX_PREDICATES} predicates"),
            ));
        }
        let key = match self.peek().kind.clone() {
            TokenKind::Ident(name) => name,
            TokenKind::Str(name) => name,
            _ => return Err(self.error_here("a metadata key or '('")),
        };
        self.advance();

        let op = match self.peek().kind {
            TokenKind::Eq => ComparisonOp::Eq,
            TokenKind::Ne => ComparisonOp::Ne,
            TokenKind::Gt => ComparisonOp::Gt,
            TokenKind::Gte => ComparisonOp::Gte,
            TokenKind::Lt => ComparisonOp::Lt,
            TokenKind::Lte => ComparisonOp::Lte,
            TokenKind::In => {
                self.advance();
                let values = self.parse_list()?;
                return Ok(FilterExpression::In { key, values });
            }
            TokenKind::Nin => {
                self.advance();
                let values = self.parse_list()?;
                return Ok(FilterExpression::NotIn { key, values });
            }
            TokenKind::Not => {
                self.advance();
                self.expect(TokenKind::In, "'IN' after 'NOT'")?;
                let values = self.parse_list()?;
                return Ok(FilterExpression::NotIn { key, values });
            }
            _ => return Err(self.error_here("a comparison operator, 'IN' or 'NIN'")),
        };
        self.advance();

        let value = self.parse_literal()?;
        Ok(FilterExpression::Comparison { key, op, value })
    }

    fn parse_list(&mut self) -> Result<Vec<MetadataValue>, ParseError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut values = Vec::new();
        if self.peek().kind == TokenKind::RBracket {
            self.advance();
            return Ok(values);
        }
        loop {
            values.push(self.parse_literal()?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(values);
                }
                _ => return Err(self.error_here("',' or ']'")),
            }
        }
    }

    fn parse_literal(&mut self) -> Result<MetadataValue, ParseError> {
        let value = match self.peek().kind.clone() {
            TokenKind::Str(s) => MetadataValue::String(s),
            TokenKind::Integer(i) => MetadataValue::Integer(i),
            TokenKind::Float(f) => MetadataValue::Float(f),
            TokenKind::True => MetadataValue::Boolean(true),
            TokenKind::False => MetadataValue::Boolean(false),
            _ => return Err(self.error_here("a string, number or boolean literal")),
        };
        self.advance();
        Ok(value)
    }
}

/// Parse `text` into a [`FilterExpression`].
pub(super) fn parse(text: &str) -> Result<FilterExpression, ParseError> {
    let tokens = Tokenizer::new(text).tokenize()?;
    let mut parser = Parser { tokens, index: 0, depth: 0, predicates: 0 };
    if parser.peek().kind == TokenKind::Eof {
        return Err(ParseError::new(0, "empty filter expression"));
    }
    let expr = parser.parse_or()?;
    if parser.peek().kind != TokenKind::Eof {
        return Err(parser.error_here("end of input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::builder::*;

    #[test]
    fn parses_documented_examples() {
        assert_eq!(parse("country == 'BG'").unwrap(), eq("country", "BG"));
        assert_eq!(
            parse("genre == 'drama' && year >= 2020").unwrap(),
            eq("genre", "drama").and(gte("year", 2020))
        );
        assert_eq!(
            parse("genre in ['comedy','documentary','drama']").unwrap(),
            is_in("genre", ["comedy", "documentary", "drama"])
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a == 1 OR b == 2 AND c == 3").unwrap();
        assert_eq!(expr, eq("a", 1).or(eq("b", 2).and(eq("c", 3))));
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse("(a == 1 OR b == 2) AND c == 3").unwrap();
        assert_eq!(expr, eq("a", 1).or(eq("b", 2)).and(eq("c", 3)));
    }

    #[test]
    fn not_applies_to_next_operand() {
        let expr = parse("NOT a == 1 AND b == 2").unwrap();
        assert_eq!(expr, eq("a", 1).negate().and(eq("b", 2)));

        let expr = parse("not (a == 1 and b == 2)").unwrap();
        assert_eq!(expr, eq("a", 1).and(eq("b", 2)).negate());
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let upper = parse("a == 1 AND b == 2 OR c IN [1]").unwrap();
        let lower = parse("a == 1 and b == 2 or c in [1]").unwrap();
        let mixed = parse("a == 1 And b == 2 oR c In [1]").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper, mixed);
    }

    #[test]
    fn nin_and_not_in_are_equivalent() {
        let nin = parse("year NIN [2019, 2020]").unwrap();
        let not_in_form = parse("year NOT IN [2019, 2020]").unwrap();
        assert_eq!(nin, not_in("year", [2019, 2020]));
        assert_eq!(nin, not_in_form);
    }

    #[test]
    fn literal_kinds() {
        assert_eq!(parse("x == -3").unwrap(), eq("x", -3));
        assert_eq!(parse("x == 2.5").unwrap(), eq("x", 2.5));
        assert_eq!(parse("x == 1e3").unwrap(), eq("x", 1000.0));
        assert_eq!(parse("x == TRUE").unwrap(), eq("x", true));
        assert_eq!(parse("x == \"dq\"").unwrap(), eq("x", "dq"));
        assert_eq!(parse(r"x == 'it\'s'").unwrap(), eq("x", "it's"));
        assert_eq!(parse("x IN []").unwrap(), is_in("x", Vec::<MetadataValue>::new()));
    }

    #[test]
    fn dotted_and_quoted_keys() {
        assert_eq!(parse("author.name == 'Ivan'").unwrap(), eq("author.name", "Ivan"));
        assert_eq!(parse("'release year' > 2000").unwrap(), gt("release year", 2000));
        assert_eq!(parse("'in' == 1").unwrap(), eq("in", 1));
    }

    #[test]
    fn errors_report_position() {
        let err = parse("genre = 'drama'").unwrap_err();
        assert_eq!(err.position, 6);

        let err = parse("genre == 'drama").unwrap_err();
        assert_eq!(err.position, 9);
        assert!(err.message.contains("unterminated"));

        let err = parse("genre == 'drama' AND").unwrap_err();
        assert_eq!(err.position, 20);
        assert!(err.message.contains("end of input"));

        let err = parse("(a == 1").unwrap_err();
        assert!(err.message.contains("')'"));

        let err = parse("a == 1 b == 2").unwrap_err();
        assert_eq!(err.position, 7);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "", "   ", "a", "a ==", "== 1", "a IN 1", "a IN [1,", "a > b", "a NOT 1", "a == 1.",
            "a == 12x", "a & b", "a == @",
        ] {
            assert!(parse(bad).is_err(), "expected parse error for {bad:?}");
        }
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let text = format!("{}a == 1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        let err = parse(&text).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }

    #[test]
    fn long_flat_chains_are_rejected() {
        let text = vec!["a == 1"; 20_000].join(" AND ");
        let err = parse(&text).unwrap_err();
        assert!(err.message.contains("expression too large"));
        // The first predicate past the budget is the one reported.
        assert_eq!(err.position, MAX_PREDICATES * "a == 1 AND ".len());
    }

    #[test]
    fn chain_at_the_budget_parses_and_evaluates() {
        let text = vec!["a == 1"; MAX_PREDICATES].join(" OR ");
        let expr = parse(&text).unwrap();
        let metadata: crate::document::Metadata =
            [("a".to_string(), crate::document::MetadataValue::Integer(1))].into_iter().collect();
        assert!(expr.evaluate(&metadata));
        assert_eq!(expr.to_string(), text);
    }
}
