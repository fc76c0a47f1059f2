//! Runtime errors, backtrace frames, and lowering rejections.
//!
//! All script-visible failures travel through one channel: a
//! [`RuntimeError`] raised by an executor and propagated out through
//! [`AvmcQueue::execute`](crate::AvmcQueue::execute). Each enclosing queue
//! whose failing node carries symbols appends one [`BacktraceFrame`] before
//! re-raising, so frames read innermost first. `try` statements intercept
//! the channel locally; nothing else recovers.
//!
//! Structural invariants (wrong operand kind, evaluation-stack underflow)
//! are not part of this taxonomy - they are bugs in compiled code and
//! panic instead.

use std::fmt;

use rill_ir::SourceLocation;
use thiserror::Error;

use crate::value::Value;

/// Error categories a script or embedder can observe.
#[derive(Clone, Debug, Error)]
pub enum ErrorKind {
    /// Typed alternative access against the wrong active alternative.
    #[error("a value of type `{actual}` was found where `{expected}` was expected")]
    StructuralMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Write attempted through a constant/temporary root or an immutable
    /// variable.
    #[error("attempt to modify {target}")]
    ImmutableAccess { target: String },

    /// Navigation through a value that cannot be navigated.
    #[error("{message}")]
    TypeMismatch { message: String },

    /// Operator failures: overflow, division by zero, unordered relational
    /// comparison.
    #[error("{message}")]
    Arithmetic { message: String },

    /// A name that resolves to nothing in the scope chain.
    #[error("undefined reference to `{name}`")]
    UndefinedName { name: String },

    /// Call through a value that is not a function.
    #[error("attempt to call a value of type `{actual}`")]
    NotCallable { actual: &'static str },

    /// A failed `assert` statement.
    #[error("assertion failed at '{location}': {message}")]
    AssertionFailed {
        location: SourceLocation,
        message: String,
    },

    /// More than one `default` clause in a single `switch`.
    #[error("multiple `default` clauses in this `switch` statement")]
    DuplicateDefault,

    /// A value raised by a script `throw` statement.
    #[error("uncaught exception: {0}")]
    Thrown(Value),
}

/// One backtrace frame: where, and what was being executed there.
#[derive(Clone, Debug)]
pub struct BacktraceFrame {
    pub location: SourceLocation,
    pub description: String,
}

impl fmt::Display for BacktraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "at {}", self.location)
        } else {
            write!(f, "at {} ({})", self.location, self.description)
        }
    }
}

/// A runtime error with the backtrace accumulated while it propagated.
///
/// Frames are appended innermost first: frame 0 is the deepest
/// symbol-carrying node the error crossed.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    kind: ErrorKind,
    frames: Vec<BacktraceFrame>,
}

impl RuntimeError {
    /// Wrap an error kind with an empty backtrace.
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError {
            kind,
            frames: Vec::new(),
        }
    }

    /// A `TypeMismatch` error with the given message.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        RuntimeError::new(ErrorKind::TypeMismatch {
            message: message.into(),
        })
    }

    /// An `Arithmetic` error with the given message.
    pub fn arithmetic(message: impl Into<String>) -> Self {
        RuntimeError::new(ErrorKind::Arithmetic {
            message: message.into(),
        })
    }

    /// An error carrying a value raised by a script `throw`.
    pub fn thrown(value: Value) -> Self {
        RuntimeError::new(ErrorKind::Thrown(value))
    }

    /// The error category.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The value a `catch` clause binds for this error.
    ///
    /// A thrown value comes back as itself; engine errors surface as a
    /// string of their message.
    pub fn payload(&self) -> Value {
        match &self.kind {
            ErrorKind::Thrown(value) => value.clone(),
            other => Value::string(other.to_string()),
        }
    }

    /// Append one backtrace frame. Called by queue execution when an error
    /// crosses a symbol-carrying node.
    pub fn push_frame(&mut self, location: SourceLocation, description: impl Into<String>) {
        self.frames.push(BacktraceFrame {
            location,
            description: description.into(),
        });
    }

    /// The accumulated frames, innermost first.
    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        RuntimeError::new(kind)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "script backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Rejections raised while compiling statements into queues.
///
/// These are static, language-level checks: they fire before any code runs,
/// so they are a separate type from [`RuntimeError`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LowerError {
    /// A `break` with no matching enclosing construct. `stmt` is the full
    /// spelling, e.g. `break` or `break switch`.
    #[error("`{stmt}` is not enclosed by a matching construct")]
    MisplacedBreak { stmt: &'static str },

    /// A `continue` with no matching enclosing loop.
    #[error("`{stmt}` is not enclosed by a matching loop")]
    MisplacedContinue { stmt: &'static str },

    /// Names beginning with `__` are reserved for the runtime.
    #[error("the name `{name}` is reserved and cannot be declared")]
    ReservedName { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn frames_accumulate_innermost_first() {
        let mut err = RuntimeError::type_mismatch("boom");
        err.push_frame(SourceLocation::new("inner.rill", 3), "expression");
        err.push_frame(SourceLocation::new("outer.rill", 9), "block");

        let frames = err.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].location.line(), 3);
        assert_eq!(frames[1].location.line(), 9);
    }

    #[test]
    fn display_includes_backtrace() {
        let mut err = RuntimeError::thrown(Value::Int(7));
        err.push_frame(SourceLocation::new("a.rill", 1), "throw statement");
        let text = err.to_string();
        assert!(text.contains("uncaught exception: 7"));
        assert!(text.contains("script backtrace:"));
        assert!(text.contains("a.rill:1"));
    }

    #[test]
    fn payload_of_engine_error_is_its_message() {
        let err = RuntimeError::new(ErrorKind::UndefinedName {
            name: "x".to_string(),
        });
        let payload = err.payload();
        assert_eq!(
            payload.opt::<std::rc::Rc<str>>().map(|s| s.to_string()),
            Some("undefined reference to `x`".to_string())
        );
    }
}
