//! Error types for the interpreter

use crate::value::JsValue;
use thiserror::Error;

/// Source location information for error messages
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Why a task was aborted by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The wall-clock budget of a single task ran out
    TaskTimeout,
    /// The wall-clock budget of the whole session ran out
    SessionTimeout,
    /// The per-task step budget ran out
    StepLimit,
    /// The host triggered the interrupt handle
    Interrupted,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AbortReason::TaskTimeout => "task timeout",
            AbortReason::SessionTimeout => "session timeout",
            AbortReason::StepLimit => "step limit exceeded",
            AbortReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Main error type for the interpreter
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("SyntaxError: {message} at {location}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("ReferenceError: {message}")]
    ReferenceError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    /// A script value in flight
    #[error("Thrown value: {0:?}")]
    Throw(JsValue),

    /// A thrown value that escaped a task
    #[error("Uncaught {name}: {message}")]
    Uncaught {
        name: String,
        message: String,
        value: JsValue,
    },

    /// Budget exhaustion or host interrupt. Script code can never catch it.
    #[error("Task aborted ({reason}) after {elapsed_ms}ms")]
    TaskAborted { reason: AbortReason, elapsed_ms: u64 },

    #[error("ModuleError: {message}")]
    ModuleError { message: String },

    /// Engine invariant violation. Script code can never catch it.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn syntax_error(message: impl Into<String>, line: u32, column: u32) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            location: SourceLocation { line, column },
        }
    }

    /// Create a syntax error without location info (raised during instantiation)
    pub fn syntax_error_simple(message: impl Into<String>) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            location: SourceLocation::default(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    /// `name is not defined`
    pub fn reference_error(name: impl std::fmt::Display) -> Self {
        JsError::ReferenceError {
            message: format!("{} is not defined", name),
        }
    }

    pub fn reference_error_with_message(message: impl Into<String>) -> Self {
        JsError::ReferenceError {
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn module_error(message: impl Into<String>) -> Self {
        JsError::ModuleError {
            message: message.into(),
        }
    }

    /// Create an internal error for unexpected interpreter states
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    pub fn thrown(value: JsValue) -> Self {
        JsError::Throw(value)
    }

    /// Errors that script code may observe through `catch` or a rejected promise
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            JsError::TaskAborted { .. } | JsError::Internal(_) | JsError::Uncaught { .. }
        )
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, JsError::TaskAborted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JsError::syntax_error("Unexpected token", 3, 7);
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token at 3:7");

        let err = JsError::reference_error("foo");
        assert_eq!(err.to_string(), "ReferenceError: foo is not defined");

        let err = JsError::TaskAborted {
            reason: AbortReason::StepLimit,
            elapsed_ms: 12,
        };
        assert_eq!(err.to_string(), "Task aborted (step limit exceeded) after 12ms");
    }

    #[test]
    fn test_catchable() {
        assert!(JsError::type_error("x").is_catchable());
        assert!(JsError::Throw(JsValue::Number(1.0)).is_catchable());
        assert!(!JsError::internal_error("bad").is_catchable());
        assert!(
            !JsError::TaskAborted {
                reason: AbortReason::Interrupted,
                elapsed_ms: 0
            }
            .is_catchable()
        );
    }
}
