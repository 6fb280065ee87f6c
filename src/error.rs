//! Error types for interception, dispatch and call assertions.

use crate::assert::CallDiagnostic;
use crate::unit::Target;
use intercept_value::ConversionError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unresolvable target: {0}")]
    UnresolvableTarget(Target),

    #[error("no function {function} is defined on {target}")]
    UnknownFunction { target: Target, function: String },

    #[error("undefined function {target}.{function}/{arity}")]
    UndefinedFunction {
        target: Target,
        function: String,
        arity: usize,
    },

    #[error("{target}.{function}/{arity} is already defined")]
    DuplicateFunction {
        target: Target,
        function: String,
        arity: usize,
    },

    #[error("arity {arity} exceeds the interceptable maximum of {max}")]
    ArityOutOfRange { arity: usize, max: usize },

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("call history limit of {limit} reached on {target}")]
    HistoryLimit { target: Target, limit: usize },

    #[error("expected call not found: {0}")]
    MissingCall(Box<CallDiagnostic>),

    #[error("unexpected call found: {0}")]
    UnexpectedCall(Box<CallDiagnostic>),

    #[error("expected {expected} call(s), found {found}: {diagnostic}")]
    CallCount {
        expected: usize,
        found: usize,
        diagnostic: Box<CallDiagnostic>,
    },
}

impl Error {
    /// The diagnostic attached to an assertion failure, if this is one.
    pub fn diagnostic(&self) -> Option<&CallDiagnostic> {
        match self {
            Error::MissingCall(d) | Error::UnexpectedCall(d) => Some(&**d),
            Error::CallCount { diagnostic, .. } => Some(&**diagnostic),
            _ => None,
        }
    }
}

/// A callable failed while being invoked on behalf of a target.
///
/// Carries the target and function so failures inside replacements can be
/// traced back to the `patch` that installed them.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationError {
    /// The target the call was routed through
    pub target: Target,
    /// The function name (e.g., "add")
    pub function: String,
    /// The kind of error that occurred
    pub kind: InvocationErrorKind,
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invocation of {}.{} failed: {}",
            self.target, self.function, self.kind
        )
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            InvocationErrorKind::ArgumentConversion { source, .. } => Some(source),
            InvocationErrorKind::ArityMismatch { .. } => None,
        }
    }
}

/// The specific kind of error that occurred in a callable.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationErrorKind {
    /// The callable was invoked with the wrong number of arguments
    ArityMismatch { expected: usize, got: usize },
    /// An argument could not be converted to the parameter type
    ArgumentConversion {
        index: usize,
        source: ConversionError,
    },
}

impl std::fmt::Display for InvocationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArityMismatch { expected, got } => {
                write!(f, "expected {} argument(s), got {}", expected, got)
            }
            Self::ArgumentConversion { index, source } => {
                write!(f, "argument {} conversion failed: {}", index, source)
            }
        }
    }
}

impl InvocationErrorKind {
    pub(crate) fn at(self, target: &Target, function: &str) -> InvocationError {
        InvocationError {
            target: target.clone(),
            function: function.to_string(),
            kind: self,
        }
    }
}
