//! Match-method registry: the canonicalization applied to raw match values
//! before they are compared.
//!
//! The method names form a closed set resolved when the recipe is parsed, so
//! an unknown name fails configuration validation instead of the first lookup.
//! The same method is applied to both the geometry side and the CSV side of
//! the join.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    /// Exact string comparison: case-sensitive, no trimming.
    Str,
    /// Leading and trailing whitespace removed before comparison.
    StrTrim,
    /// Trimmed and lowercased before comparison.
    StrLower,
}

impl MatchMethod {
    pub fn canonicalize(&self, raw: &str) -> String {
        match self {
            MatchMethod::Str => raw.to_string(),
            MatchMethod::StrTrim => raw.trim().to_string(),
            MatchMethod::StrLower => raw.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchMethod::Str => "str",
            MatchMethod::StrTrim => "str-trim",
            MatchMethod::StrLower => "str-lower",
        };
        write!(f, "{name}")
    }
}
