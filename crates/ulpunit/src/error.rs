//! Error types at the test-node boundary.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::assertion::AssertionFailed;

/// Boxed error surfaced by test code that is not an assertion failure.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result of one `run` of a test node.
pub type TestResult = Result<(), TestError>;

/// Why a test's `run` did not complete.
///
/// `TestError` deliberately does not implement [`std::error::Error`], so any
/// error type converts into it with `?`. An [`AssertionFailed`] that arrives
/// through the blanket conversion is recovered by downcast and keeps its
/// diagnostic.
pub enum TestError {
    /// One of the runtime's own assertions failed.
    Assertion(AssertionFailed),
    /// Any other error returned by the code under test.
    Error(BoxError),
}

impl TestError {
    /// Wrap an arbitrary message as a recognized, non-assertion error.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Error(message.into())
    }

    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}

impl<E> From<E> for TestError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let boxed: BoxError = Box::new(err);
        match boxed.downcast::<AssertionFailed>() {
            Ok(failed) => Self::Assertion(*failed),
            Err(other) => Self::Error(other),
        }
    }
}

impl fmt::Debug for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion(failed) => f.debug_tuple("Assertion").field(failed).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion(failed) => write!(f, "{failed}"),
            Self::Error(err) => write!(f, "{err}"),
        }
    }
}

/// Misuse of the runtime API by the embedding program.
///
/// Raised as a panic payload and never converted into a test outcome.
#[derive(Debug, Clone, Error)]
#[error("contract violation: {reason}")]
pub struct ContractViolation {
    pub reason: &'static str,
}

/// Invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected a non-negative integer ULP tolerance, got '{value}'")]
    InvalidMaxUlps { var: &'static str, value: String },
    #[error("{var}: unknown value '{value}' (expected one of: {expected})")]
    UnknownValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
