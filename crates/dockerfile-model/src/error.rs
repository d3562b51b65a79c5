//! Error types for Dockerfile processing.
//!
//! [`ModelError`] wraps the failures that can occur while loading, parsing,
//! resolving and saving Dockerfiles.

use std::io;

use thiserror::Error;

use dockerfile_model_syntax::{Error as SyntaxError, ParseError};

/// The main error type for Dockerfile processing.
///
/// The `Parse` variant keeps the source text next to the error so callers
/// can render a snippet around the failing position.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error(transparent)]
    Syntax(SyntaxError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialising the parsed document did not give back the text it was
    /// parsed from.
    #[error("serialised document differs from `{path}`")]
    RoundTrip { path: String },
}

impl ModelError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}

impl From<SyntaxError> for ModelError {
    fn from(err: SyntaxError) -> Self {
        Self::Syntax(err)
    }
}
