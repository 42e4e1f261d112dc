//! Boolean tag queries: `python AND learning NOT beginner`.
//!
//! Parsing is deliberately flat. A query becomes three lists (positive terms,
//! operators seen, negated terms) rather than a tree, so parentheses and
//! precedence carry no meaning: `(` and `)` stay attached to whatever term
//! they touch. Evaluation then picks one mode for the whole expression:
//!
//! - any negated term present in a label rejects immediately
//! - no positive terms accepts
//! - no operators, or any `OR`, accepts when some term is in some label
//! - only `AND` accepts when every term is in some label
//!
//! A query mixing `AND` with `OR` therefore evaluates as pure `OR`;
//! [`QueryExpression::is_ambiguous`] reports that case.
//!
//! Malformed content never fails. Only a non-string query value is rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::error::{Error, Result};

static OPERATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(AND|OR|NOT)\b").expect("operator pattern is a valid regex"));

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

/// Binary operators recorded by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOperator {
    And,
    Or,
}

impl std::fmt::Display for BoolOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

impl std::str::FromStr for BoolOperator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(format!("Invalid boolean operator: {}", s)),
        }
    }
}

/// How positive terms combine during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Some term must appear in some label.
    Any,
    /// Every term must appear in some label.
    All,
}

/// A parsed, flattened boolean query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExpression {
    /// Positive terms, in order, uppercased.
    pub terms: Vec<String>,
    /// Operators in the order they were seen.
    pub operators: Vec<BoolOperator>,
    /// Terms that follow `NOT`, uppercased.
    pub negated_terms: Vec<String>,
}

impl QueryExpression {
    /// Parse a query string. Never fails.
    pub fn parse(query: &str) -> Self {
        let normalized = normalize(query);
        let tokens = tokenize(&normalized);

        let mut expr = Self::default();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i].as_str();
            match token {
                "NOT" if i + 1 < tokens.len() => {
                    push_term(&mut expr.negated_terms, &tokens[i + 1]);
                    i += 2;
                    continue;
                }
                "AND" => expr.operators.push(BoolOperator::And),
                "OR" => expr.operators.push(BoolOperator::Or),
                // trailing NOT with nothing to negate
                "NOT" => {}
                _ => push_term(&mut expr.terms, token),
            }
            i += 1;
        }

        trace!(
            query = query,
            terms = expr.terms.len(),
            operators = expr.operators.len(),
            negated = expr.negated_terms.len(),
            "Parsed boolean query"
        );
        expr
    }

    /// Parse a query arriving as JSON. Anything but a string is rejected.
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        value
            .as_str()
            .map(Self::parse)
            .ok_or_else(|| Error::InvalidInput(format!("boolean query must be a string, got {}", value)))
    }

    /// True when there is nothing to match or reject.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.negated_terms.is_empty()
    }

    /// True when both `AND` and `OR` were seen; such queries evaluate as `OR`.
    pub fn is_ambiguous(&self) -> bool {
        self.operators.contains(&BoolOperator::And) && self.operators.contains(&BoolOperator::Or)
    }

    /// The combination mode evaluation will use for positive terms.
    pub fn mode(&self) -> MatchMode {
        if self.operators.is_empty() || self.operators.contains(&BoolOperator::Or) {
            MatchMode::Any
        } else {
            MatchMode::All
        }
    }

    /// Evaluate against a set of labels (one tag, or all tags of one item).
    /// Matching is case-insensitive substring.
    pub fn evaluate<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_lowercase()).collect();
        let in_some_label = |term: &String| {
            let term = term.to_lowercase();
            labels.iter().any(|label| label.contains(&term))
        };

        if self.negated_terms.iter().any(in_some_label) {
            return false;
        }
        if self.terms.is_empty() {
            return true;
        }
        match self.mode() {
            MatchMode::Any => self.terms.iter().any(in_some_label),
            MatchMode::All => self.terms.iter().all(in_some_label),
        }
    }

    /// Evaluate against a single tag.
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.evaluate(&[tag])
    }
}

/// Uppercase, pad operators with spaces, collapse whitespace.
fn normalize(query: &str) -> String {
    let upper = query.to_uppercase();
    let padded = OPERATOR_REGEX.replace_all(&upper, " $1 ");
    WHITESPACE_REGEX.replace_all(&padded, " ").trim().to_string()
}

/// Split on spaces outside double quotes. Quotes stay in the token; an
/// unmatched quote simply absorbs the rest of the input.
fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in query.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn push_term(list: &mut Vec<String>, token: &str) {
    let term = token.trim_matches('"');
    if !term.is_empty() {
        list.push(term.to_string());
    }
}
