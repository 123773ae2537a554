// crates/cat-api-contract/src/matcher.rs
// ============================================================================
// Module: JSON-Like Matching
// Description: Partial structural matching of JSON responses.
// Purpose: Assert response shape without pinning every field.
// Dependencies: regex, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`JsonPattern`] describes the parts of a JSON document a scenario cares
//! about. Matching is partial:
//! - objects must contain every expected key; extra keys are ignored;
//! - arrays must contain, for every expected element, at least one matching
//!   actual element (order-insensitive);
//! - regex patterns match strings, and numbers rendered as text;
//! - exact patterns compare values for equality.
//!
//! Mismatches carry a JSONPath-style location such as `$[0].url`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A regex pattern failed to compile.
    #[error("invalid regex {pattern}: {source}")]
    Regex {
        /// Pattern source.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },
}

/// A located pattern mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// JSONPath-style location of the mismatch.
    pub path: String,
    /// Why the value did not match.
    pub reason: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

// ============================================================================
// SECTION: Pattern
// ============================================================================

/// Partial JSON pattern.
#[derive(Debug, Clone)]
pub enum JsonPattern {
    /// Matches any value, including `null`.
    Any,
    /// Matches an equal value.
    Exact(Value),
    /// Matches a string (or number) against a regex.
    Regex(Regex),
    /// Matches an object containing every listed key.
    Object(Vec<(String, JsonPattern)>),
    /// Matches an array containing a match for every listed element.
    Array(Vec<JsonPattern>),
}

impl JsonPattern {
    /// Builds an exact-match pattern.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// Compiles a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Regex`] when `pattern` is not a valid regex.
    pub fn regex(pattern: &str) -> Result<Self, PatternError> {
        Regex::new(pattern).map(Self::Regex).map_err(|source| PatternError::Regex {
            pattern: pattern.to_string(),
            source,
        })
    }

    /// Builds an object pattern from key/pattern pairs.
    #[must_use]
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(fields.into_iter().map(|(key, pattern)| (key.into(), pattern)).collect())
    }

    /// Builds an array pattern.
    #[must_use]
    pub const fn array(elements: Vec<Self>) -> Self {
        Self::Array(elements)
    }

    /// Checks `actual` against this pattern.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`] encountered.
    pub fn check(&self, actual: &Value) -> Result<(), Mismatch> {
        self.check_at(actual, "$")
    }

    /// Recursive matcher carrying the current location.
    fn check_at(&self, actual: &Value, path: &str) -> Result<(), Mismatch> {
        match self {
            Self::Any => Ok(()),
            Self::Exact(expected) => {
                if expected == actual {
                    Ok(())
                } else {
                    Err(mismatch(path, format!("expected {expected}, found {actual}")))
                }
            }
            Self::Regex(regex) => {
                let text = match actual {
                    Value::String(text) => text.clone(),
                    Value::Number(number) => number.to_string(),
                    other => {
                        return Err(mismatch(
                            path,
                            format!("expected text matching /{regex}/, found {}", kind(other)),
                        ));
                    }
                };
                if regex.is_match(&text) {
                    Ok(())
                } else {
                    Err(mismatch(path, format!("\"{text}\" does not match /{regex}/")))
                }
            }
            Self::Object(fields) => {
                let Value::Object(map) = actual else {
                    return Err(mismatch(path, format!("expected object, found {}", kind(actual))));
                };
                for (key, pattern) in fields {
                    let child = format!("{path}.{key}");
                    let value = map.get(key).ok_or_else(|| mismatch(&child, "missing key"))?;
                    pattern.check_at(value, &child)?;
                }
                Ok(())
            }
            Self::Array(elements) => {
                let Value::Array(items) = actual else {
                    return Err(mismatch(path, format!("expected array, found {}", kind(actual))));
                };
                for (index, pattern) in elements.iter().enumerate() {
                    let mut first_failure = None;
                    let found = items.iter().enumerate().any(|(position, item)| {
                        match pattern.check_at(item, &format!("{path}[{position}]")) {
                            Ok(()) => true,
                            Err(failure) => {
                                if first_failure.is_none() {
                                    first_failure = Some(failure);
                                }
                                false
                            }
                        }
                    });
                    if !found {
                        let detail = first_failure
                            .map_or_else(|| "array is empty".to_string(), |f| f.to_string());
                        return Err(mismatch(
                            path,
                            format!("no element matches expected element {index} ({detail})"),
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Builds a [`Mismatch`].
fn mismatch(path: &str, reason: impl Into<String>) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Names a JSON value kind for messages.
const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
