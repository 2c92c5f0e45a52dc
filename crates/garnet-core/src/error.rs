//! Language-level error model
//!
//! Built-in methods signal failures by returning [`VmError::Raised`] holding
//! an Error object. The message is rendered once, at construction, so that
//! callers compare plain strings.

use crate::class::{ids, ClassId};
use crate::value::Value;
use crate::VmError;
use std::fmt;

/// Error kinds with a dedicated class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Uncategorized runtime failure
    Error,
    /// Wrong runtime variant for an operation or argument
    TypeError,
    /// Wrong arity, or a value outside the accepted domain
    ArgumentError,
}

impl ErrorKind {
    /// Class backing this kind
    pub fn class_id(self) -> ClassId {
        match self {
            ErrorKind::Error => ids::ERROR,
            ErrorKind::TypeError => ids::TYPE_ERROR,
            ErrorKind::ArgumentError => ids::ARGUMENT_ERROR,
        }
    }

    /// Class name, also the message prefix
    pub fn class_name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ArgumentError => "ArgumentError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Raise an error of `kind`
pub fn raise(kind: ErrorKind, text: impl fmt::Display) -> VmError {
    VmError::Raised(Value::error(kind, text))
}

/// Raise a generic Error
pub fn runtime_error(text: impl fmt::Display) -> VmError {
    raise(ErrorKind::Error, text)
}

/// Raise an ArgumentError
pub fn argument_error(text: impl fmt::Display) -> VmError {
    raise(ErrorKind::ArgumentError, text)
}

/// Raise a TypeError with a caller-chosen message
pub fn type_error(text: impl fmt::Display) -> VmError {
    raise(ErrorKind::TypeError, text)
}

/// TypeError naming the expected class and the class of `got`
pub fn wrong_type(expected: &str, got: &Value) -> VmError {
    type_error(format_args!(
        "Expect argument to be {}. got={}",
        expected,
        got.type_name()
    ))
}

/// ArgumentError for a wrong number of arguments
pub fn wrong_arity(expected: usize, got: usize) -> VmError {
    let noun = if expected == 1 { "argument" } else { "arguments" };
    argument_error(format_args!(
        "Expect to have {} {}. got={}",
        expected, noun, got
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: VmError) -> String {
        match err {
            VmError::Raised(v) => v.error_message().unwrap(),
            other => panic!("not raised: {other}"),
        }
    }

    #[test]
    fn test_wrong_type_message() {
        let err = wrong_type("String", &Value::int(1));
        assert_eq!(
            message(err),
            "TypeError: Expect argument to be String. got=Integer"
        );
    }

    #[test]
    fn test_wrong_arity_message() {
        assert_eq!(
            message(wrong_arity(2, 1)),
            "ArgumentError: Expect to have 2 arguments. got=1"
        );
        assert_eq!(
            message(wrong_arity(1, 0)),
            "ArgumentError: Expect to have 1 argument. got=0"
        );
    }

    #[test]
    fn test_kind_classes() {
        assert_eq!(ErrorKind::TypeError.class_id(), ids::TYPE_ERROR);
        assert_eq!(ErrorKind::Error.to_string(), "Error");
    }
}
