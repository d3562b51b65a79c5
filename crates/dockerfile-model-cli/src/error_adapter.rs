//! Error adapter for converting [`ModelError`] to miette diagnostics.
//!
//! Parse errors are rendered with a snippet of the Dockerfile and a label at
//! the failing position. Every other error is rendered as a plain report.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use dockerfile_model::{ModelError, syntax::ParseError};

/// Adapter for a parse error together with the text it came from.
pub struct ParseErrorAdapter<'a> {
    err: &'a ParseError,
    src: &'a str,
}

impl<'a> ParseErrorAdapter<'a> {
    pub fn new(err: &'a ParseError, src: &'a str) -> Self {
        Self { err, src }
    }
}

impl fmt::Debug for ParseErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseErrorAdapter")
            .field("err", &self.err)
            .finish()
    }
}

impl fmt::Display for ParseErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.err.message())
    }
}

impl std::error::Error for ParseErrorAdapter<'_> {}

impl MietteDiagnostic for ParseErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.err.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.err.code().description()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_primary_with_span(
            Some(self.err.position().to_string()),
            error_span(self.src, self.err.offset()),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// Adapter for [`ModelError`] variants without source information.
pub struct ErrorAdapter<'a>(pub &'a ModelError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            ModelError::Io(_) => Some(Box::new("dockerfile_model::io")),
            ModelError::Parse { err, .. } => Some(Box::new(err.code())),
            ModelError::Syntax(err) => Some(Box::new(err.code())),
            ModelError::Config(_) => Some(Box::new("dockerfile_model::config")),
            ModelError::RoundTrip { .. } => Some(Box::new("dockerfile_model::round_trip")),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            ModelError::RoundTrip { .. } => Some(Box::new(
                "the document cannot be reproduced losslessly; use --resolve or --stages to process it anyway",
            )),
            _ => None,
        }
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A parse error with source location information.
    Parse(ParseErrorAdapter<'a>),
    /// Any other error.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Parse(p) => fmt::Display::fmt(p, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Parse(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Parse(p) => p.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Parse(p) => p.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Parse(p) => p.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Parse(p) => p.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// A span covering the character at `offset`, or an empty span at the end
/// of the text.
fn error_span(src: &str, offset: usize) -> SourceSpan {
    let len = src
        .get(offset..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8);
    SourceSpan::new(offset.into(), len)
}

/// Convert a [`ModelError`] into a reportable error.
pub fn to_reportable(err: &ModelError) -> Reportable<'_> {
    match err {
        ModelError::Parse { err, src } => Reportable::Parse(ParseErrorAdapter::new(err, src)),
        _ => Reportable::Error(ErrorAdapter(err)),
    }
}

#[cfg(test)]
mod tests {
    use dockerfile_model::syntax::{Dockerfile, ErrorCode};

    use super::*;

    fn parse_error(src: &str) -> ModelError {
        let err = Dockerfile::parse(src).unwrap_err();
        ModelError::new_parse_error(err, src)
    }

    #[test]
    fn test_parse_error_has_label() {
        let err = parse_error("FROM alpine\nFORM x\n");
        let reportable = to_reportable(&err);

        let Reportable::Parse(adapter) = &reportable else {
            panic!("Expected Parse");
        };
        assert_eq!(adapter.to_string(), "unknown instruction");
        assert_eq!(
            reportable.code().map(|code| code.to_string()).as_deref(),
            Some(ErrorCode::E102.as_str())
        );

        let labels: Vec<_> = reportable.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].primary());
        assert_eq!(labels[0].offset(), 12);
        assert_eq!(labels[0].len(), 1);
    }

    #[test]
    fn test_label_at_end_of_input_is_empty() {
        let err = parse_error("ARG ");
        let labels: Vec<_> = to_reportable(&err).labels().unwrap().collect();
        assert_eq!(labels[0].offset(), 4);
        assert_eq!(labels[0].len(), 0);
    }

    #[test]
    fn test_non_parse_error() {
        let err = ModelError::Config("bad".to_string());
        let reportable = to_reportable(&err);

        assert!(matches!(reportable, Reportable::Error(_)));
        assert_eq!(reportable.to_string(), "Configuration error: bad");
        assert!(reportable.labels().is_none());
    }

    #[test]
    fn test_round_trip_error_code() {
        let err = ModelError::RoundTrip {
            path: "Dockerfile".to_string(),
        };
        let reportable = to_reportable(&err);

        assert_eq!(reportable.to_string(), "serialised document differs from `Dockerfile`");
        assert_eq!(
            reportable.code().map(|code| code.to_string()).as_deref(),
            Some("dockerfile_model::round_trip")
        );
        assert!(reportable.help().is_some());
    }
}
