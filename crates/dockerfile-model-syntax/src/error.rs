//! Error types for the Dockerfile model.
//!
//! Three kinds of failure exist, and all of them are raised synchronously at
//! the point of violation:
//! - [`ParseError`] - text does not match a construct's grammar; carries the
//!   exact line and column of the first non-matching character
//! - [`Error::InvalidArgument`] - programmatic misuse, such as an empty value
//!   for a required field
//! - [`Error::VariableUnset`] - a `${NAME?message}` reference resolved while
//!   `NAME` was unset; carries the user-authored message verbatim
//!
//! Every variant maps to an [`ErrorCode`] for searchability.

mod error_code;
mod parse_error;

pub use error_code::ErrorCode;
pub use parse_error::{ParseError, Position};

use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the Dockerfile model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid value for `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("{message}")]
    VariableUnset { name: String, message: String },

    #[error("instruction {0} is not contained in the Dockerfile")]
    InstructionNotFound(usize),
}

impl Error {
    /// Create an [`Error::InvalidArgument`].
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse(err) => err.code(),
            Error::InvalidArgument { .. } => ErrorCode::E200,
            Error::InstructionNotFound(_) => ErrorCode::E201,
            Error::VariableUnset { .. } => ErrorCode::E300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_unset_message_is_verbatim() {
        let err = Error::VariableUnset {
            name: "TAG".to_string(),
            message: "err".to_string(),
        };
        assert_eq!(err.to_string(), "err");
        assert_eq!(err.code(), ErrorCode::E300);
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let parse = ParseError::at("ARG ", 4, ErrorCode::E100, "expected argument name");
        let err = Error::from(parse.clone());
        assert_eq!(err.to_string(), parse.to_string());
        assert_eq!(err.code(), ErrorCode::E100);
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = Error::invalid_argument("image_name", "value must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid value for `image_name`: value must not be empty"
        );
    }
}
