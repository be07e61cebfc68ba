//! Search queries
//!
//! A [`SearchQuery`] is built once per request and is read-only afterwards.
//! Exact and predicate queries match on names and may be fed to the
//! declaration collectors; custom queries carry an arbitrary symbol predicate
//! and only run through the general search path.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::core::error::{FinderError, Result};
use crate::core::symbols::Symbol;

/// What kind of query this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    /// Match a single name exactly (optionally ignoring case)
    Exact,
    /// Match names against a predicate (substring, regex, fuzzy)
    Predicate,
    /// Arbitrary symbol predicate
    Custom,
}

type SymbolPredicate = Arc<dyn Fn(&Symbol) -> bool + Send + Sync>;

#[derive(Clone)]
enum Matcher {
    Exact { name: String, ignore_case: bool },
    Substring { text: String, ignore_case: bool },
    Regex(Regex),
    Fuzzy { name: String, max_distance: usize },
    Custom(SymbolPredicate),
}

/// An immutable description of what to search for
#[derive(Clone)]
pub struct SearchQuery {
    kind: SearchKind,
    matcher: Matcher,
}

impl SearchQuery {
    /// Match declarations named exactly `name`
    pub fn exact(name: impl Into<String>, ignore_case: bool) -> Self {
        Self {
            kind: SearchKind::Exact,
            matcher: Matcher::Exact {
                name: name.into(),
                ignore_case,
            },
        }
    }

    /// Match declarations whose name contains `text`
    pub fn substring(text: impl Into<String>, ignore_case: bool) -> Self {
        Self {
            kind: SearchKind::Predicate,
            matcher: Matcher::Substring {
                text: text.into(),
                ignore_case,
            },
        }
    }

    /// Match declarations whose name matches a regular expression
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| FinderError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            kind: SearchKind::Predicate,
            matcher: Matcher::Regex(regex),
        })
    }

    /// Match declarations whose name is within a small edit distance of
    /// `name`, ignoring case. The tolerated distance grows with the length.
    pub fn fuzzy(name: impl Into<String>) -> Self {
        let name: String = name.into().to_lowercase();
        let max_distance = (name.chars().count() / 4).max(1);
        Self {
            kind: SearchKind::Predicate,
            matcher: Matcher::Fuzzy { name, max_distance },
        }
    }

    /// Match any symbol accepted by `predicate`
    pub fn custom(predicate: impl Fn(&Symbol) -> bool + Send + Sync + 'static) -> Self {
        Self {
            kind: SearchKind::Custom,
            matcher: Matcher::Custom(Arc::new(predicate)),
        }
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    /// The searched name, for exact queries
    pub fn name(&self) -> Option<&str> {
        match &self.matcher {
            Matcher::Exact { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn ignore_case(&self) -> bool {
        match &self.matcher {
            Matcher::Exact { ignore_case, .. } | Matcher::Substring { ignore_case, .. } => {
                *ignore_case
            }
            Matcher::Fuzzy { .. } => true,
            Matcher::Regex(_) | Matcher::Custom(_) => false,
        }
    }

    /// Name predicate. Total over all strings; custom queries accept every
    /// name and decide in [`SearchQuery::matches_symbol`].
    pub fn matches_name(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::Exact { name, ignore_case } => {
                if *ignore_case {
                    eq_ignore_case(name, candidate)
                } else {
                    name == candidate
                }
            }
            Matcher::Substring { text, ignore_case } => {
                if *ignore_case {
                    candidate.to_lowercase().contains(&text.to_lowercase())
                } else {
                    candidate.contains(text.as_str())
                }
            }
            Matcher::Regex(regex) => regex.is_match(candidate),
            Matcher::Fuzzy { name, max_distance } => {
                edit_distance(name, &candidate.to_lowercase()) <= *max_distance
            }
            Matcher::Custom(_) => true,
        }
    }

    /// Full symbol predicate
    pub fn matches_symbol(&self, symbol: &Symbol) -> bool {
        match &self.matcher {
            Matcher::Custom(predicate) => predicate(symbol),
            _ => self.matches_name(symbol.name()),
        }
    }
}

impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Exact { name, ignore_case } => f
                .debug_struct("Exact")
                .field("name", name)
                .field("ignore_case", ignore_case)
                .finish(),
            Matcher::Substring { text, ignore_case } => f
                .debug_struct("Substring")
                .field("text", text)
                .field("ignore_case", ignore_case)
                .finish(),
            Matcher::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Matcher::Fuzzy { name, max_distance } => f
                .debug_struct("Fuzzy")
                .field("name", name)
                .field("max_distance", max_distance)
                .finish(),
            Matcher::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Levenshtein distance over chars
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
