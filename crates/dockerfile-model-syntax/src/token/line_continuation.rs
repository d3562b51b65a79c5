use crate::token::{LeafKind, Token, aggregate_token};

/// The escape char at the end of a line, optional trailing whitespace, and
/// the newline it escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContinuationToken {
    tokens: Vec<Token>,
}

aggregate_token!(LineContinuationToken);

impl LineContinuationToken {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Build a continuation with no trailing whitespace.
    pub fn new(escape_char: char) -> Self {
        Self::from_tokens(vec![Token::symbol(escape_char.to_string()), Token::newline("\n")])
    }

    /// The escape char that starts this continuation.
    pub fn escape_char(&self) -> char {
        self.tokens
            .first()
            .and_then(Token::as_leaf)
            .filter(|leaf| leaf.kind() == LeafKind::Symbol)
            .and_then(|leaf| leaf.text().chars().next())
            .unwrap_or('\\')
    }
}
