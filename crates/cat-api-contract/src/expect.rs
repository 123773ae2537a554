// crates/cat-api-contract/src/expect.rs
// ============================================================================
// Module: Response Expectations
// Description: Ordered assertions over a completed API exchange.
// Purpose: Express status, header, shape, schema, and latency checks declaratively.
// Dependencies: regex, reqwest, thiserror
// ============================================================================

//! ## Overview
//! [`Expectations`] is an ordered list of checks built fluently and verified
//! against an [`ApiResponse`]. Verification stops at the first failing check
//! and reports it as an [`AssertionError`]. Body excerpts in errors are
//! truncated so large payloads do not flood reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;

use crate::client::ApiResponse;
use crate::client::ResponseBody;
use crate::client::millis;
use crate::matcher::JsonPattern;
use crate::matcher::Mismatch;
use crate::matcher::PatternError;
use crate::schema::CompiledSchema;

/// Maximum body characters quoted in assertion messages.
const MAX_EXCERPT_CHARS: usize = 200;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A failed expectation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssertionError {
    /// Unexpected status code.
    #[error("expected status {expected}, got {actual} (body: {body})")]
    Status {
        /// Expected status.
        expected: u16,
        /// Actual status.
        actual: u16,
        /// Body excerpt.
        body: String,
    },
    /// A required header is absent.
    #[error("missing header {name}")]
    MissingHeader {
        /// Header name.
        name: String,
    },
    /// A header value did not match.
    #[error("header {name} value \"{value}\" does not match /{pattern}/")]
    Header {
        /// Header name.
        name: String,
        /// Actual value.
        value: String,
        /// Expected pattern.
        pattern: String,
    },
    /// The body was expected to be JSON.
    #[error("response body is not json (body: {body})")]
    NotJson {
        /// Body excerpt.
        body: String,
    },
    /// The JSON body did not match the expected pattern.
    #[error("json mismatch at {0}")]
    Json(Mismatch),
    /// The JSON body violated a schema.
    #[error("{title} schema violations: {}", violations.join("; "))]
    Schema {
        /// Schema title.
        title: String,
        /// Violation messages.
        violations: Vec<String>,
    },
    /// The response took longer than the budget.
    #[error("response took {elapsed_ms} ms, budget {budget_ms} ms")]
    TooSlow {
        /// Budget in milliseconds.
        budget_ms: u64,
        /// Observed latency in milliseconds.
        elapsed_ms: u64,
    },
    /// A custom body predicate failed.
    #[error("body check failed: {0}")]
    Body(String),
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Custom predicate over a response body.
type BodyPredicate = Arc<dyn Fn(&ResponseBody) -> Result<(), String> + Send + Sync>;

/// A single check.
#[derive(Clone)]
enum Check {
    /// Status equals.
    Status(StatusCode),
    /// Header present and matching.
    Header {
        /// Lower-case header name.
        name: String,
        /// Value pattern.
        pattern: Regex,
    },
    /// JSON body matches a partial pattern.
    JsonLike(JsonPattern),
    /// JSON body validates against a schema.
    Schema(CompiledSchema),
    /// Elapsed time within a budget.
    ResponseTime(Duration),
    /// Custom body predicate.
    Body(BodyPredicate),
}

/// Ordered response expectations.
#[derive(Clone, Default)]
pub struct Expectations {
    /// Checks in evaluation order.
    checks: Vec<Check>,
}

impl Expectations {
    /// Creates an empty expectation set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the given status code.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.checks.push(Check::Status(status));
        self
    }

    /// Expects header `name` to be present with a value matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when `pattern` is not a valid regex.
    pub fn header_matches(mut self, name: &str, pattern: &str) -> Result<Self, PatternError> {
        let pattern = Regex::new(pattern).map_err(|source| PatternError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;
        self.checks.push(Check::Header {
            name: name.to_ascii_lowercase(),
            pattern,
        });
        Ok(self)
    }

    /// Expects a JSON body matching `pattern`.
    #[must_use]
    pub fn json_like(mut self, pattern: JsonPattern) -> Self {
        self.checks.push(Check::JsonLike(pattern));
        self
    }

    /// Expects a JSON body valid against `schema`.
    #[must_use]
    pub fn json_schema(mut self, schema: CompiledSchema) -> Self {
        self.checks.push(Check::Schema(schema));
        self
    }

    /// Expects the exchange to complete within `budget`.
    #[must_use]
    pub fn response_time_under(mut self, budget: Duration) -> Self {
        self.checks.push(Check::ResponseTime(budget));
        self
    }

    /// Expects `predicate` to accept the body.
    #[must_use]
    pub fn body<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ResponseBody) -> Result<(), String> + Send + Sync + 'static,
    {
        self.checks.push(Check::Body(Arc::new(predicate)));
        self
    }

    /// Returns the number of checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns true when no checks are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Verifies every check in order.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AssertionError`].
    pub fn verify(&self, response: &ApiResponse) -> Result<(), AssertionError> {
        self.checks.iter().try_for_each(|check| check.verify(response))
    }
}

impl fmt::Debug for Expectations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectations").field("checks", &self.checks.len()).finish()
    }
}

impl Check {
    /// Evaluates one check.
    fn verify(&self, response: &ApiResponse) -> Result<(), AssertionError> {
        match self {
            Self::Status(expected) => {
                if response.status == *expected {
                    Ok(())
                } else {
                    Err(AssertionError::Status {
                        expected: expected.as_u16(),
                        actual: response.status.as_u16(),
                        body: excerpt(&response.body.text),
                    })
                }
            }
            Self::Header {
                name,
                pattern,
            } => {
                let value = response.header(name).ok_or_else(|| AssertionError::MissingHeader {
                    name: name.clone(),
                })?;
                if pattern.is_match(value) {
                    Ok(())
                } else {
                    Err(AssertionError::Header {
                        name: name.clone(),
                        value: value.to_string(),
                        pattern: pattern.as_str().to_string(),
                    })
                }
            }
            Self::JsonLike(pattern) => pattern.check(json_body(response)?).map_err(AssertionError::Json),
            Self::Schema(schema) => schema.validate(json_body(response)?).map_err(|violations| {
                AssertionError::Schema {
                    title: schema.title().to_string(),
                    violations,
                }
            }),
            Self::ResponseTime(budget) => {
                if response.elapsed <= *budget {
                    Ok(())
                } else {
                    Err(AssertionError::TooSlow {
                        budget_ms: millis(*budget),
                        elapsed_ms: millis(response.elapsed),
                    })
                }
            }
            Self::Body(predicate) => predicate(&response.body).map_err(AssertionError::Body),
        }
    }
}

/// Returns the parsed JSON body or a [`AssertionError::NotJson`].
fn json_body(response: &ApiResponse) -> Result<&serde_json::Value, AssertionError> {
    response.json().ok_or_else(|| AssertionError::NotJson {
        body: excerpt(&response.body.text),
    })
}

/// Truncates body text for messages.
fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(MAX_EXCERPT_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}
