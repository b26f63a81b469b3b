//! Runtime error types.
//!
//! Every fatal condition in the runtime travels as a [`SolError`] through
//! `Result`, unwinding to the nearest protected boundary owned by the caller.

use thiserror::Error;

use crate::{SourcePosition, StackFrame};

/// The kind of runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// Error raised by running code (type errors, explicit errors, ...)
    #[error("runtime error")]
    Runtime,
    /// Allocation failed even after an emergency collection
    #[error("memory error")]
    OutOfMemory,
    /// A growable array reached its hard limit
    #[error("limit exceeded")]
    LimitExceeded,
    /// A hook asked the thread to suspend; not a failure
    #[error("yield")]
    Yield,
    /// The error handler itself failed
    #[error("error in error handling")]
    ErrorHandler,
}

/// A runtime error with message and call-stack snapshot.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, SolError};
///
/// let error = SolError::new(ErrorKind::Runtime, "main.sol:3: boom");
/// assert_eq!(error.to_string(), "main.sol:3: boom");
/// assert!(error.stack.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SolError {
    /// The class of error
    pub kind: ErrorKind,
    /// Human-readable error message, already prefixed with "source:line:"
    /// when raised from interpreted code
    pub message: String,
    /// Call stack at the time of the error, innermost first
    pub stack: Vec<StackFrame>,
    /// Source position where the error occurred, if known
    pub source_position: Option<SourcePosition>,
}

/// Result alias used across the runtime crates.
pub type SolResult<T> = Result<T, SolError>;

impl SolError {
    /// Create an error of the given kind with no location information.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
            source_position: None,
        }
    }

    /// Shorthand for a [`ErrorKind::Runtime`] error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// The suspension signal raised when a hook yields.
    pub fn yielded() -> Self {
        Self::new(ErrorKind::Yield, "attempt to yield from a hook")
    }

    /// Whether this value is the suspension signal rather than a failure.
    pub fn is_yield(&self) -> bool {
        self.kind == ErrorKind::Yield
    }

    /// Attach the source position the error was raised at.
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.source_position = Some(position);
        self
    }

    /// Attach a traceback.
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = stack;
        self
    }
}
