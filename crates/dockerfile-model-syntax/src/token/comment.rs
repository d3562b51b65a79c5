//! Comment lines.

use crate::{
    error::ParseError,
    parse,
    token::{LeafKind, Token, aggregate_token},
};

/// A `#` comment line, either standing alone in a Dockerfile or embedded
/// after a line continuation.
///
/// Children: optional indentation, the `#` marker, the text fragment, and
/// the newline when the comment is not at the end of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentToken {
    tokens: Vec<Token>,
}

aggregate_token!(CommentToken);

impl CommentToken {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parse a single comment line.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse::parse_complete(text, parse::comment_line)
    }

    /// Build `# text` terminated by a newline.
    pub fn new(text: &str) -> Self {
        let mut tokens = vec![Token::leaf(LeafKind::CommentMarker, "#")];
        if !text.is_empty() {
            tokens.push(Token::fragment(format!(" {}", text.lines().next().unwrap_or_default())));
        }
        tokens.push(Token::newline("\n"));
        Self::from_tokens(tokens)
    }

    /// The comment text after `#`, trimmed of surrounding whitespace.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .filter_map(Token::as_leaf)
            .find(|leaf| leaf.kind() == LeafKind::StringFragment)
            .map(|leaf| leaf.text().trim().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_indentation() {
        let comment = CommentToken::parse("  #  hello world \n").unwrap();
        assert_eq!(comment.text(), "hello world");
        assert_eq!(comment.to_string(), "  #  hello world \n");
    }

    #[test]
    fn test_empty_comment() {
        let comment = CommentToken::parse("#").unwrap();
        assert_eq!(comment.text(), "");
    }

    #[test]
    fn test_new() {
        assert_eq!(CommentToken::new("note").to_string(), "# note\n");
        assert_eq!(CommentToken::new("").to_string(), "#\n");
    }
}
