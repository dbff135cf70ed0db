use thiserror::Error;

use crate::expr::Rational;

/// Errors produced while building programs or analyzing them.
///
/// There are three families:
///
/// - malformed programs (`Parse`, `InvalidProbability`, `ProbabilitySum`, `UnknownVariable`,
///   `CircularDependency`, `NotProbSolvable`, `InvalidDistribution`, `MissingLoopGuard`), reported
///   when the program is built;
/// - incompleteness (`Unsupported`), meaning the analysis cannot decide something and the caller
///   should treat the question as open;
/// - internal assumption violations (`Internal`), meaning an expression has a shape the engine
///   cannot handle soundly.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid probability {probability} in update of `{variable}`")]
    InvalidProbability {
        variable: String,
        probability: Rational,
    },

    #[error("branch probabilities for `{variable}` sum up to {sum} instead of 1")]
    ProbabilitySum { variable: String, sum: Rational },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("circular variable dependency: `{variable}` uses `{dependency}` which is updated later")]
    CircularDependency { variable: String, dependency: String },

    #[error("update of `{variable}` is not prob-solvable: {reason}")]
    NotProbSolvable { variable: String, reason: String },

    #[error("invalid distribution for `{variable}`: {reason}")]
    InvalidDistribution { variable: String, reason: String },

    #[error("program has no loop guard")]
    MissingLoopGuard,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("internal assumption violated: {0}")]
    Internal(String),
}

impl Error {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Returns `true` if the error only says that the analysis could not decide something.
    pub fn is_incompleteness(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
