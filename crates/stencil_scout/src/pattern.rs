//! Pattern expressions over element search text.
//!
//! A pattern is a list of OR-groups separated by `|`. Each group is a list of
//! AND-terms separated by the configured delimiter (`:` or `;`). A term prefixed
//! with `!` must be absent from the search text; every other term must be
//! present. Containment is plain case-insensitive substring search.
//!
//! ```text
//! cisco;router|juniper;!switch
//! └────┬─────┘ └──────┬──────┘
//!   group 1        group 2        (true if either group holds)
//! ```
//!
//! Patterns without `|` or `!` take a fast path that evaluates a plain AND
//! chain. Both paths give identical answers.

use serde::{Deserialize, Serialize};
use std::fmt;

const OR_SEPARATOR: char = '|';
const NEGATION: char = '!';

/// Separator between AND-terms inside one OR-group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AndDelimiter {
    #[serde(rename = ":")]
    Colon,
    #[default]
    #[serde(rename = ";")]
    Semicolon,
}

impl AndDelimiter {
    pub fn as_char(self) -> char {
        match self {
            AndDelimiter::Colon => ':',
            AndDelimiter::Semicolon => ';',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ':' => Some(AndDelimiter::Colon),
            ';' => Some(AndDelimiter::Semicolon),
            _ => None,
        }
    }
}

impl fmt::Display for AndDelimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One AND-term of an OR-group. Text is trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Text must occur in the search text
    Require(String),
    /// Text must not occur in the search text
    Exclude(String),
}

impl Term {
    fn holds(&self, search_text: &str) -> bool {
        match self {
            Term::Require(text) => search_text.contains(text.as_str()),
            Term::Exclude(text) => !search_text.contains(text.as_str()),
        }
    }
}

/// A parsed pattern, ready to be evaluated against many candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternExpr {
    /// AND chain with no `|` or `!`
    Simple(Vec<String>),
    /// OR of AND-groups, terms possibly negated
    Expression(Vec<Vec<Term>>),
}

impl PatternExpr {
    /// Parse a pattern, choosing the fast path when the pattern allows it.
    pub fn parse(pattern: &str, delimiter: AndDelimiter) -> Self {
        if pattern.contains(OR_SEPARATOR) || pattern.contains(NEGATION) {
            Self::general(pattern, delimiter)
        } else {
            Self::simple(pattern, delimiter)
        }
    }

    /// Parse as a plain AND chain. Operators are treated as literal text.
    pub fn simple(pattern: &str, delimiter: AndDelimiter) -> Self {
        let terms = pattern
            .split(delimiter.as_char())
            .map(normalize_term)
            .filter(|t| !t.is_empty())
            .collect();
        PatternExpr::Simple(terms)
    }

    /// Parse with the full OR/AND/NOT grammar.
    pub fn general(pattern: &str, delimiter: AndDelimiter) -> Self {
        let groups = pattern
            .split(OR_SEPARATOR)
            .map(|group| parse_group(group, delimiter.as_char()))
            .collect();
        PatternExpr::Expression(groups)
    }

    /// Evaluate against search text that is already lower-cased.
    pub fn matches(&self, search_text: &str) -> bool {
        match self {
            PatternExpr::Simple(terms) => terms.iter().all(|t| search_text.contains(t.as_str())),
            PatternExpr::Expression(groups) => groups
                .iter()
                .any(|terms| terms.iter().all(|t| t.holds(search_text))),
        }
    }
}

/// Split one OR-group into terms.
///
/// After `!` everything up to the next delimiter is the negated text, so
/// `!a:b` is `NOT a AND b`. A `!` in the middle of a term closes that term.
fn parse_group(group: &str, delimiter: char) -> Vec<Term> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut chars = group.chars().peekable();

    while let Some(c) = chars.next() {
        if c == NEGATION {
            push_term(&mut terms, &current, Term::Require);
            current.clear();

            let mut negated = String::new();
            while let Some(&next) = chars.peek() {
                if next == delimiter {
                    break;
                }
                negated.push(next);
                chars.next();
            }
            push_term(&mut terms, &negated, Term::Exclude);
        } else if c == delimiter {
            push_term(&mut terms, &current, Term::Require);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_term(&mut terms, &current, Term::Require);

    terms
}

fn push_term(terms: &mut Vec<Term>, raw: &str, make: fn(String) -> Term) {
    let text = normalize_term(raw);
    if !text.is_empty() {
        terms.push(make(text));
    }
}

fn normalize_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Evaluate a single pattern against search text (case-insensitive).
pub fn evaluate(pattern: &str, search_text: &str, delimiter: AndDelimiter) -> bool {
    PatternExpr::parse(pattern, delimiter).matches(&search_text.to_lowercase())
}

/// True if any of the patterns matches.
pub fn any_matches(patterns: &[PatternExpr], search_text: &str) -> bool {
    patterns.iter().any(|p| p.matches(search_text))
}
