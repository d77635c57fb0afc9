//! User search criteria: attribute equality and SQL-LIKE patterns.
//!
//! Supported syntax:
//! - `attribute=value` exact match (case-insensitive)
//! - `attribute~pattern` LIKE match: `%` any run of characters, `_` exactly
//!   one character, `\` escapes the next character
//! - the pseudo-attribute `name` refers to the principal name itself

use std::collections::HashMap;

use crate::directory::errors::DirectoryError;

/// Pseudo-attribute addressing the principal name.
pub const NAME_ATTRIBUTE: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Equals,
    Like,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub attribute: String,
    pub op: MatchOp,
    pub value: String,
}

impl Criterion {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: MatchOp::Equals,
            value: value.into(),
        }
    }

    pub fn like(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: MatchOp::Like,
            value: pattern.into(),
        }
    }

    /// Parse `attr=value` or `attr~pattern`. The first operator character wins.
    pub fn parse(s: &str) -> Result<Self, DirectoryError> {
        let pos = s.find(['=', '~']).ok_or_else(|| {
            DirectoryError::InvalidFilter(format!("`{s}` has no `=` or `~` operator"))
        })?;
        let (attribute, rest) = s.split_at(pos);
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(DirectoryError::InvalidFilter(format!(
                "`{s}` is missing an attribute name"
            )));
        }
        let value = &rest[1..];
        Ok(if rest.starts_with('=') {
            Self::equals(attribute, value)
        } else {
            Self::like(attribute, value)
        })
    }

    fn matches_value(&self, candidate: &str) -> bool {
        match self.op {
            MatchOp::Equals => candidate.to_lowercase() == self.value.to_lowercase(),
            MatchOp::Like => like_match(&self.value, candidate),
        }
    }

    /// True when the name (for `name`) or any value of the attribute matches.
    pub fn matches(&self, name: &str, attributes: &HashMap<String, Vec<String>>) -> bool {
        if self.attribute.eq_ignore_ascii_case(NAME_ATTRIBUTE) {
            return self.matches_value(name);
        }
        attributes
            .get(&self.attribute)
            .map(|values| values.iter().any(|v| self.matches_value(v)))
            .unwrap_or(false)
    }
}

/// Conjunction of criteria. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub criteria: Vec<Criterion>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn parse_all<S: AsRef<str>>(filters: &[S]) -> Result<Self, DirectoryError> {
        let criteria = filters
            .iter()
            .map(|f| Criterion::parse(f.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { criteria })
    }

    pub fn matches(&self, name: &str, attributes: &HashMap<String, Vec<String>>) -> bool {
        self.criteria.iter().all(|c| c.matches(name, attributes))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Lit(char),
    One,
    Many,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => {
                // Collapse runs of `%`
                if tokens.last() != Some(&Token::Many) {
                    tokens.push(Token::Many);
                }
            }
            '_' => tokens.push(Token::One),
            '\\' => match chars.next() {
                Some(escaped) => tokens.push(Token::Lit(escaped)),
                None => tokens.push(Token::Lit('\\')),
            },
            other => tokens.push(Token::Lit(other)),
        }
    }
    tokens
}

/// Case-insensitive SQL LIKE.
pub fn like_match(pattern: &str, candidate: &str) -> bool {
    let tokens = tokenize(&pattern.to_lowercase());
    let text: Vec<char> = candidate.to_lowercase().chars().collect();

    // matched[j]: tokens so far can consume exactly text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Many => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= matched[j];
                    next[j] = reachable;
                }
            }
            Token::One => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            Token::Lit(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matched = next;
    }

    matched[text.len()]
}
