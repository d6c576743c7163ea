//! Metadata filter grammar applied during filtered search.
//!
//! A [`SearchFilter`] is a flat map of metadata key to constraint string.
//! Every key in the filter must be present on the candidate record and
//! satisfy its constraint for the record to match.

use std::collections::HashMap;

/// A constraint on a single metadata value.
///
/// Parsed once from the raw constraint string so `matches()` doesn't
/// re-parse the leading character on every candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Constraint {
    /// `record[key] == value` exactly.
    Eq(String),
    /// `record[key] > value`, compared as strings.
    Gt(String),
    /// `record[key] < value`, compared as strings.
    Lt(String),
}

impl Constraint {
    fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix('>') {
            Constraint::Gt(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix('<') {
            Constraint::Lt(rest.to_string())
        } else {
            Constraint::Eq(raw.to_string())
        }
    }

    fn matches(&self, actual: &str) -> bool {
        match self {
            Constraint::Eq(expected) => actual == expected,
            Constraint::Gt(expected) => actual > expected.as_str(),
            Constraint::Lt(expected) => actual < expected.as_str(),
        }
    }
}

/// A metadata filter applied to candidate search results.
///
/// # Grammar
///
/// Each entry is `key -> constraint`:
/// - `"value"` — exact equality (default).
/// - `">value"` — `record[key] > value`, compared lexicographically as
///   strings (not numerically).
/// - `"<value"` — `record[key] < value`, same comparison.
///
/// A record matches only if every key in the filter is present in its
/// metadata and satisfies its constraint. An empty filter matches
/// everything.
#[derive(Clone, Debug, Default)]
pub struct SearchFilter {
    constraints: HashMap<String, Constraint>,
}

impl SearchFilter {
    /// Creates an empty filter (matches every record).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from raw `key -> constraint` strings.
    pub fn from_raw(raw: HashMap<String, String>) -> Self {
        Self {
            constraints: raw
                .into_iter()
                .map(|(k, v)| (k, Constraint::parse(&v)))
                .collect(),
        }
    }

    /// Returns true if the filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns true if `metadata` satisfies every constraint in this
    /// filter.
    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        self.constraints.iter().all(|(key, constraint)| {
            metadata
                .get(key)
                .map(|actual| constraint.matches(actual))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = SearchFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&meta(&[])));
        assert!(filter.matches(&meta(&[("a", "1")])));
    }

    #[test]
    fn test_equality_match() {
        let filter = SearchFilter::from_raw(meta(&[("category", "image")]));
        assert!(filter.matches(&meta(&[("category", "image")])));
        assert!(!filter.matches(&meta(&[("category", "text")])));
    }

    #[test]
    fn test_missing_key_does_not_match() {
        let filter = SearchFilter::from_raw(meta(&[("category", "image")]));
        assert!(!filter.matches(&meta(&[("other", "x")])));
    }

    #[test]
    fn test_greater_than_string_comparison() {
        let filter = SearchFilter::from_raw(meta(&[("score", ">5")]));
        assert!(filter.matches(&meta(&[("score", "9")])));
        // "5" < "50" lexicographically is false since '5'=='5' then '0'
        // has no counterpart - this is a string compare, not numeric.
        assert!(!filter.matches(&meta(&[("score", "10")])));
    }

    #[test]
    fn test_less_than_string_comparison() {
        let filter = SearchFilter::from_raw(meta(&[("score", "<5")]));
        assert!(filter.matches(&meta(&[("score", "3")])));
        assert!(!filter.matches(&meta(&[("score", "9")])));
    }

    #[test]
    fn test_multiple_constraints_all_must_match() {
        let filter = SearchFilter::from_raw(meta(&[
            ("category", "image"),
            ("score", ">1"),
        ]));
        assert!(filter.matches(&meta(&[("category", "image"), ("score", "5")])));
        assert!(!filter.matches(&meta(&[("category", "text"), ("score", "5")])));
    }
}
