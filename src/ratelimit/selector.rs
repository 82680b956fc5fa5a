//! Limiter selectors
//!
//! A small predicate AST evaluated against the tags an outgoing call declares
//! (`service`, `action`, ...). Tag values compare case-insensitively since
//! ARM provider namespaces and operations are case-insensitive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tags describing one outgoing cloud API call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTags(HashMap<String, String>);

impl CallTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tag
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Predicate selecting which calls a limiter governs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Selector {
    /// `tag = 'value'`
    Equals { tag: String, value: String },
    /// `tag in ('a', 'b')`
    In { tag: String, values: Vec<String> },
    /// All clauses hold
    And { all: Vec<Selector> },
}

impl Selector {
    pub fn equals(tag: &str, value: &str) -> Self {
        Selector::Equals {
            tag: tag.to_string(),
            value: value.to_string(),
        }
    }

    pub fn one_of(tag: &str, values: &[&str]) -> Self {
        Selector::In {
            tag: tag.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Conjoin with another selector, flattening nested `And`s
    pub fn and(self, other: Selector) -> Self {
        let mut all = match self {
            Selector::And { all } => all,
            single => vec![single],
        };
        match other {
            Selector::And { all: more } => all.extend(more),
            single => all.push(single),
        }
        Selector::And { all }
    }

    /// Evaluate against a call's tags. A missing tag never matches.
    pub fn matches(&self, tags: &CallTags) -> bool {
        match self {
            Selector::Equals { tag, value } => tags
                .get(tag)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(value)),
            Selector::In { tag, values } => tags.get(tag).is_some_and(|actual| {
                values.iter().any(|v| actual.eq_ignore_ascii_case(v))
            }),
            Selector::And { all } => all.iter().all(|s| s.matches(tags)),
        }
    }
}

/// Render as a where-clause, mostly for logs and `azinv limiters`
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Equals { tag, value } => write!(f, "{} = '{}'", tag, value),
            Selector::In { tag, values } => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "{} in ({})", tag, quoted.join(", "))
            }
            Selector::And { all } => {
                let parts: Vec<String> = all.iter().map(|s| s.to_string()).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}
