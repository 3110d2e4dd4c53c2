//! `key=value;key=value` parameter strings
//!
//! Values may be wrapped in braces to carry nested delimiters, e.g.
//! `dataChannel={port=9191;interface=0.0.0.0}`. A backslash stops the next
//! character from acting as a delimiter; both characters stay in the value,
//! so paths like `C:\data\logs` pass through unchanged. Keys are
//! case-insensitive; a repeated key replaces the earlier value. Parameters
//! that do not split into exactly one key and one value are skipped.

use crate::error::{GridLinesError, Result};
use std::collections::HashMap;

/// Ordered, case-insensitive parameter map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValuePairs {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl KeyValuePairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original insertion position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key.to_ascii_lowercase()) {
            Some(&pos) => self.entries[pos] = (key, value),
            None => {
                self.index.insert(key.to_ascii_lowercase(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Value for a key, ignoring case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(&key.to_ascii_lowercase())
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&key.to_ascii_lowercase())
    }

    /// Parse a value with `FromStr`; `None` when absent or unparsable
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Boolean value accepting `true/false`, `yes/no`, `1/0` (any case)
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    /// Entries in insertion order, with keys as first written
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A character tagged with whether it is structural or literal
#[derive(Clone, Copy)]
struct Token {
    ch: char,
    literal: bool,
}

/// Parse a `;`-delimited list of `key=value` parameters
pub fn parse_key_value_pairs(input: &str) -> Result<KeyValuePairs> {
    let mut pairs = KeyValuePairs::new();

    for segment in split_parameters(input)? {
        let parts = split_structural(&segment, '=');
        if parts.len() != 2 {
            continue;
        }

        let key = collect(trim(parts[0]));
        if key.is_empty() {
            continue;
        }

        let value = collect(unwrap_braces(trim(parts[1])));
        pairs.insert(key, value);
    }

    Ok(pairs)
}

/// Split on top-level `;`, tagging escaped and brace-nested characters
fn split_parameters(input: &str) -> Result<Vec<Vec<Token>>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(Token { ch, literal: true });
                if let Some(next) = chars.next() {
                    current.push(Token {
                        ch: next,
                        literal: true,
                    });
                }
            }
            '{' => {
                current.push(Token {
                    ch,
                    literal: depth > 0,
                });
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(GridLinesError::ConnectionString(format!(
                        "unexpected '}}' in \"{}\"",
                        input
                    )));
                }
                depth -= 1;
                current.push(Token {
                    ch,
                    literal: depth > 0,
                });
            }
            ';' if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(Token {
                ch,
                literal: depth > 0,
            }),
        }
    }

    if depth > 0 {
        return Err(GridLinesError::ConnectionString(format!(
            "missing '}}' in \"{}\"",
            input
        )));
    }

    segments.push(current);
    Ok(segments)
}

fn split_structural(tokens: &[Token], delimiter: char) -> Vec<&[Token]> {
    tokens
        .split(|t| !t.literal && t.ch == delimiter)
        .collect()
}

fn trim(tokens: &[Token]) -> &[Token] {
    let is_space = |t: &Token| !t.literal && t.ch.is_whitespace();
    let start = tokens.iter().position(|t| !is_space(t)).unwrap_or(tokens.len());
    let end = tokens.iter().rposition(|t| !is_space(t)).map_or(start, |p| p + 1);
    &tokens[start..end]
}

fn unwrap_braces(tokens: &[Token]) -> &[Token] {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last))
            if tokens.len() >= 2
                && !first.literal
                && first.ch == '{'
                && !last.literal
                && last.ch == '}' =>
        {
            &tokens[1..tokens.len() - 1]
        }
        _ => tokens,
    }
}

fn collect(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.ch).collect()
}
