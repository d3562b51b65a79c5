//! Error codes for the Dockerfile model.
//!
//! Error codes are organized by phase:
//! - `E1xx` - Syntax errors
//! - `E2xx` - Argument and state errors
//! - `E3xx` - Variable resolution errors

use std::fmt;

/// Error codes for categorizing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Syntax Errors (E1xx)
    // =========================================================================
    /// Unexpected input.
    ///
    /// The grammar expected a construct that does not start at this position.
    E100,

    /// Trailing input.
    ///
    /// A construct was parsed successfully but text remains after it.
    E101,

    /// Unknown instruction.
    ///
    /// The line starts with a word that is not a Dockerfile instruction.
    E102,

    /// Unterminated quoted string.
    ///
    /// A literal was opened with a quote but the line ended first.
    E103,

    /// Bad substitution.
    ///
    /// A `${...}` reference has no name or an unknown modifier.
    E104,

    /// Missing closing brace.
    ///
    /// A `${` reference is not terminated by `}`.
    E105,

    /// Invalid parser directive.
    ///
    /// A recognised directive carries a value it cannot accept.
    E106,

    /// Invalid trigger instruction.
    ///
    /// `ONBUILD` wraps an instruction that may not be deferred.
    E107,

    // =========================================================================
    // Argument Errors (E2xx)
    // =========================================================================
    /// Invalid argument.
    ///
    /// A required value was empty or does not form a valid token.
    E200,

    /// Instruction not found.
    ///
    /// The referenced instruction is not part of the Dockerfile.
    E201,

    // =========================================================================
    // Resolution Errors (E3xx)
    // =========================================================================
    /// Variable unset.
    ///
    /// A `${NAME?message}` reference was resolved while `NAME` was unset.
    E300,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Syntax errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            ErrorCode::E107 => "E107",
            // Argument errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            // Resolution errors
            ErrorCode::E300 => "E300",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "unexpected input",
            ErrorCode::E101 => "trailing input",
            ErrorCode::E102 => "unknown instruction",
            ErrorCode::E103 => "unterminated quoted string",
            ErrorCode::E104 => "bad substitution",
            ErrorCode::E105 => "missing closing brace",
            ErrorCode::E106 => "invalid parser directive",
            ErrorCode::E107 => "invalid trigger instruction",
            ErrorCode::E200 => "invalid argument",
            ErrorCode::E201 => "instruction not found",
            ErrorCode::E300 => "variable unset",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E100.to_string(), "E100");
        assert_eq!(ErrorCode::E200.to_string(), "E200");
        assert_eq!(ErrorCode::E300.to_string(), "E300");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E104.description(), "bad substitution");
        assert_eq!(ErrorCode::E201.description(), "instruction not found");
    }
}
