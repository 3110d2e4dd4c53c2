//! Filter expressions understood by the simulated publisher
//!
//! Supports the subset used for signal-type selection:
//!
//! ```text
//! FILTER [TOP n] <table> [WHERE SignalType = 'X' [OR SignalType LIKE 'X*'] ...]
//! ```
//!
//! Keywords are case-insensitive. `*` and `%` are trailing wildcards in
//! `LIKE` patterns.

use crate::error::{GridLinesError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Equals,
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '=' {
            chars.next();
            tokens.push(Token::Equals);
        } else if ch == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(c) => text.push(c),
                    None => return Err(invalid(expression, "unterminated quoted value")),
                }
            }
            tokens.push(Token::Quoted(text));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '=' || c == '\'' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

fn invalid(expression: &str, reason: &str) -> GridLinesError {
    GridLinesError::Provider(format!(
        "Invalid filter expression \"{}\": {}",
        expression, reason
    ))
}

/// One `SignalType` comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCondition {
    Equals(String),
    /// Prefix match from a `LIKE` pattern
    StartsWith(String),
}

impl TypeCondition {
    pub fn matches(&self, acronym: &str) -> bool {
        match self {
            TypeCondition::Equals(expected) => acronym.eq_ignore_ascii_case(expected),
            TypeCondition::StartsWith(prefix) => acronym
                .to_ascii_uppercase()
                .starts_with(&prefix.to_ascii_uppercase()),
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    pub table: String,
    /// Maximum number of signals to select
    pub top: Option<usize>,
    /// Alternatives joined by `OR`; empty selects everything
    pub conditions: Vec<TypeCondition>,
}

impl FilterExpression {
    pub fn parse(expression: &str) -> Result<Self> {
        let tokens = tokenize(expression)?;
        let mut tokens = tokens.into_iter().peekable();

        match tokens.next() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("FILTER") => {}
            _ => return Err(invalid(expression, "expected FILTER")),
        }

        let mut top = None;
        if matches!(tokens.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case("TOP")) {
            tokens.next();
            top = match tokens.next() {
                Some(Token::Word(n)) => Some(
                    n.parse::<usize>()
                        .map_err(|_| invalid(expression, "TOP needs a count"))?,
                ),
                _ => return Err(invalid(expression, "TOP needs a count")),
            };
        }

        let table = match tokens.next() {
            Some(Token::Word(table)) => table,
            _ => return Err(invalid(expression, "expected a table name")),
        };

        let mut conditions = Vec::new();
        match tokens.next() {
            None => {}
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("WHERE") => loop {
                conditions.push(parse_condition(expression, &mut tokens)?);
                match tokens.next() {
                    None => break,
                    Some(Token::Word(w)) if w.eq_ignore_ascii_case("OR") => {}
                    _ => return Err(invalid(expression, "expected OR")),
                }
            },
            _ => return Err(invalid(expression, "expected WHERE")),
        }

        Ok(Self {
            table,
            top,
            conditions,
        })
    }

    /// Whether a signal of type `acronym` is selected
    pub fn matches(&self, acronym: &str) -> bool {
        self.conditions.is_empty() || self.conditions.iter().any(|c| c.matches(acronym))
    }
}

fn parse_condition(
    expression: &str,
    tokens: &mut impl Iterator<Item = Token>,
) -> Result<TypeCondition> {
    match tokens.next() {
        Some(Token::Word(field)) if field.eq_ignore_ascii_case("SignalType") => {}
        _ => return Err(invalid(expression, "only SignalType conditions are supported")),
    }

    let like = match tokens.next() {
        Some(Token::Equals) => false,
        Some(Token::Word(op)) if op.eq_ignore_ascii_case("LIKE") => true,
        _ => return Err(invalid(expression, "expected = or LIKE")),
    };

    let value = match tokens.next() {
        Some(Token::Quoted(value)) => value,
        _ => return Err(invalid(expression, "expected a quoted value")),
    };

    if like {
        let prefix = value.trim_end_matches(['*', '%']).to_string();
        Ok(TypeCondition::StartsWith(prefix))
    } else {
        Ok(TypeCondition::Equals(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILTER_EXPRESSION;

    #[test]
    fn test_default_expression() {
        let filter = FilterExpression::parse(DEFAULT_FILTER_EXPRESSION).unwrap();
        assert_eq!(filter.top, Some(10));
        assert_eq!(filter.table, "ActiveMeasurements");
        assert_eq!(
            filter.conditions,
            vec![
                TypeCondition::Equals("FREQ".to_string()),
                TypeCondition::StartsWith("VPH".to_string()),
            ]
        );

        assert!(filter.matches("FREQ"));
        assert!(filter.matches("VPHM"));
        assert!(filter.matches("vpha"));
        assert!(!filter.matches("IPHM"));
    }

    #[test]
    fn test_no_where_selects_all() {
        let filter = FilterExpression::parse("filter ActiveMeasurements").unwrap();
        assert_eq!(filter.top, None);
        assert!(filter.matches("ALOG"));
    }

    #[test]
    fn test_spacing_around_equals() {
        let filter =
            FilterExpression::parse("FILTER ActiveMeasurements WHERE SignalType = 'DFDT'").unwrap();
        assert!(filter.matches("DFDT"));
        assert!(!filter.matches("FREQ"));
    }

    #[test]
    fn test_rejects_malformed() {
        for expression in [
            "",
            "SELECT * FROM ActiveMeasurements",
            "FILTER TOP x ActiveMeasurements",
            "FILTER ActiveMeasurements WHERE SignalType = 'FREQ",
            "FILTER ActiveMeasurements WHERE Device = 'SHELBY'",
            "FILTER ActiveMeasurements WHERE SignalType = 'FREQ' AND SignalType = 'DFDT'",
        ] {
            assert!(
                FilterExpression::parse(expression).is_err(),
                "accepted {:?}",
                expression
            );
        }
    }
}
