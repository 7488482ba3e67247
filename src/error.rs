use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HornError {
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ErrorKind {
    Parse(ParseError),
    Runtime(RuntimeError),
}

impl From<ParseError> for HornError {
    fn from(err: ParseError) -> Self {
        Self {
            kind: ErrorKind::Parse(err),
        }
    }
}

impl From<RuntimeError> for HornError {
    fn from(err: RuntimeError) -> Self {
        Self {
            kind: ErrorKind::Runtime(err),
        }
    }
}

pub type HornResult<T> = std::result::Result<T, HornError>;

impl std::error::Error for HornError {}

impl fmt::Display for HornError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse(e) => write!(f, "{}", e),
            ErrorKind::Runtime(e) => write!(f, "{}", e),
        }
    }
}

/// Errors raised while turning clause or query text into terms. These are the
/// only errors a caller sees synchronously; unification failures, unknown
/// predicates and exhausted branches are all ordinary search outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParseError {
    UnbalancedBrackets { token: String },
    MissingPredicate { token: String },
    EmptyTerm { token: String },
    InvalidExpression { token: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnbalancedBrackets { token } => {
                write!(f, "unbalanced brackets in '{}'", token.escape_debug())
            }
            Self::MissingPredicate { token } => {
                write!(f, "expected a predicate application in '{}'", token.escape_debug())
            }
            Self::EmptyTerm { token } => {
                write!(f, "empty term in '{}'", token.escape_debug())
            }
            Self::InvalidExpression { token } => {
                write!(f, "could not parse '{}' as an expression", token.escape_debug())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuntimeError {
    FileLoading { msg: String },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::FileLoading { msg } => write!(f, "problem loading file: {}", msg),
        }
    }
}
