//! Command patterns and their match results.
//!
//! A [`Pattern`] is compiled once when its plugin registers. Matching is an
//! unanchored search over the message text with the prefix already stripped,
//! so `admin list$` matches `admin list` but also `please admin list`; anchor
//! with `^` when that matters.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::RegistrationError;

/// A compiled command pattern with named capture groups.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compiles `source`.
    ///
    /// Both `(?<name>...)` and `(?P<name>...)` group syntax are accepted.
    pub fn compile(source: &str) -> Result<Self, RegistrationError> {
        let regex = Regex::new(source).map_err(|source_err| RegistrationError::InvalidPattern {
            pattern: source.to_owned(),
            source: source_err,
        })?;
        Ok(Self { regex })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Names of the capture groups, in declaration order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    /// Searches `text` and returns the match with its named captures.
    ///
    /// Groups that did not participate or matched the empty string are
    /// left out of the result.
    pub fn match_text(&self, text: &str) -> Option<MatchResult> {
        let caps = self.regex.captures(text)?;
        let captures = self
            .capture_names()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| m.as_str())
                    .filter(|value| !value.is_empty())
                    .map(|value| (name.to_owned(), value.to_owned()))
            })
            .collect();

        Some(MatchResult {
            matched: caps.get(0).map(|m| m.as_str().to_owned()).unwrap_or_default(),
            captures,
        })
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

/// A successful pattern match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    matched: String,
    captures: HashMap<String, String>,
}

impl MatchResult {
    /// The text matched by the whole pattern.
    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// Returns a named capture; `None` if the group is absent or was empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    /// Returns `true` if the named capture is present.
    pub fn contains(&self, name: &str) -> bool {
        self.captures.contains_key(name)
    }

    /// Iterates over the present captures, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.captures.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of present captures.
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Returns `true` if no capture is present.
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}
