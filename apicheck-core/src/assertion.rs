//! The assertion engine.
//!
//! A [`ResponseContract`] declares the expected status code and an ordered
//! list of [`Expectation`]s. [`ResponseContract::check`] evaluates all of
//! them against one response. Evaluation never short-circuits: a contract
//! with five expectations always yields five field results, in declaration
//! order, so every mismatch surfaces in a single run.
//!
//! ```rust
//! use apicheck_core::assertion::ResponseContract;
//! use apicheck_core::matcher::Matcher;
//! use serde_json::json;
//!
//! let contract = ResponseContract::new(200)?
//!     .expect("status", Matcher::equals("ok"))?
//!     .expect("method", Matcher::equals("GET"))?;
//!
//! let evaluation = contract.check(200, &json!({"status": "ok", "method": "GET"}));
//! assert!(evaluation.passed());
//! # Ok::<(), apicheck_core::Error>(())
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::*;

use crate::{matcher::Matcher, path::FieldPath, Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub path: FieldPath,
    pub matcher: Matcher,
}

impl Expectation {
    pub fn new(path: impl AsRef<str>, matcher: Matcher) -> Result<Expectation> {
        Ok(Expectation {
            path: FieldPath::parse(path.as_ref())?,
            matcher,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseContract {
    expected_status: u16,
    expectations: Vec<Expectation>,
}

impl ResponseContract {
    /// Create a contract expecting `status`, which must be within 100..=599.
    pub fn new(status: u16) -> Result<ResponseContract> {
        if !(100..=599).contains(&status) {
            return Err(Error::InvalidScenario {
                name: String::new(),
                reason: format!("expected status {status} is not a valid HTTP status"),
            });
        }
        Ok(ResponseContract {
            expected_status: status,
            expectations: Vec::new(),
        })
    }

    /// Append an expectation on `path`.
    pub fn expect(mut self, path: impl AsRef<str>, matcher: Matcher) -> Result<ResponseContract> {
        self.expectations.push(Expectation::new(path, matcher)?);
        Ok(self)
    }

    pub fn expected_status(&self) -> u16 {
        self.expected_status
    }

    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    /// Evaluate the whole contract against a response.
    pub fn check(&self, actual_status: u16, body: &Value) -> Evaluation {
        let status_matched = actual_status == self.expected_status;
        if !status_matched {
            debug!(
                "status mismatch: expected {} but was {actual_status}",
                self.expected_status
            );
        }

        let field_results = self
            .expectations
            .iter()
            .map(|expectation| {
                let verdict = expectation.matcher.evaluate(expectation.path.resolve(body));
                trace!(
                    "{} ({}): passed={}",
                    expectation.path,
                    expectation.matcher,
                    verdict.passed
                );
                FieldResult {
                    path: expectation.path.to_string(),
                    matcher: expectation.matcher.to_string(),
                    passed: verdict.passed,
                    message: verdict.message,
                }
            })
            .collect();

        Evaluation {
            expected_status: self.expected_status,
            actual_status,
            status_matched,
            field_results,
        }
    }
}

/// Result of evaluating one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    pub path: String,
    pub matcher: String,
    pub passed: bool,
    pub message: String,
}

/// Result of evaluating a whole contract against one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub expected_status: u16,
    pub actual_status: u16,
    pub status_matched: bool,
    pub field_results: Vec<FieldResult>,
}

impl Evaluation {
    /// The status matched and every field check passed.
    pub fn passed(&self) -> bool {
        self.status_matched && self.field_results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FieldResult> {
        self.field_results.iter().filter(|r| !r.passed)
    }
}
