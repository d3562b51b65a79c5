//! Literal text with optional quotes and embedded variable references.

use crate::{
    error::{Error, ParseError, Result},
    parse::{self, LiteralGrammar},
    token::{LeafKind, Token, VariableRefToken, aggregate_token},
};

/// A run of literal text.
///
/// The children are string fragments, variable references, line
/// continuations with their embedded comments, and the quote symbols that
/// open and close quoted runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralToken {
    tokens: Vec<Token>,
    can_contain_variables: bool,
}

aggregate_token!(LiteralToken);

impl LiteralToken {
    pub(crate) fn from_tokens(tokens: Vec<Token>, can_contain_variables: bool) -> Self {
        Self {
            tokens,
            can_contain_variables,
        }
    }

    /// Parse free text into a literal.
    ///
    /// The whole text is taken verbatim; when `can_contain_variables` is set,
    /// `$NAME` and `${...}` become variable references.
    pub fn parse(text: &str, escape_char: char, can_contain_variables: bool) -> std::result::Result<Self, ParseError> {
        let grammar = if can_contain_variables {
            LiteralGrammar::TEXT
        } else {
            LiteralGrammar::TEXT.without_variables()
        };
        parse::parse_complete(text, parse::literal_token(escape_char, grammar))
    }

    /// Build a literal that must parse as a single argument of `grammar`.
    pub(crate) fn create(
        name: &'static str,
        value: &str,
        escape_char: char,
        grammar: LiteralGrammar,
    ) -> Result<Self> {
        if value.is_empty() && !grammar.allow_empty {
            return Err(Error::invalid_argument(name, "value must not be empty"));
        }
        parse::parse_complete(value, parse::literal_token(escape_char, grammar))
            .map_err(|err| Error::invalid_argument(name, err.message().to_string()))
    }

    /// Whether `$` introduces variable references in this literal.
    pub fn can_contain_variables(&self) -> bool {
        self.can_contain_variables
    }

    /// The quote character of the quoted run the literal starts with, if any.
    pub fn quote_char(&self) -> Option<char> {
        match self.tokens.first()?.as_leaf()? {
            leaf if leaf.kind() == LeafKind::Symbol => match leaf.text() {
                "\"" => Some('"'),
                "'" => Some('\''),
                _ => None,
            },
            _ => None,
        }
    }

    /// The text of the literal without quotes, line continuations or
    /// embedded comments. Variable references keep their source text.
    pub fn value(&self) -> String {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Leaf(leaf) if leaf.kind() == LeafKind::StringFragment => Some(leaf.text().to_string()),
                Token::VariableRef(variable) => Some(variable.to_string()),
                _ => None,
            })
            .collect()
    }

    /// The variable references directly inside this literal.
    pub fn variable_refs(&self) -> impl Iterator<Item = &VariableRefToken> {
        self.tokens.iter().filter_map(Token::as_variable_ref)
    }

    /// Returns `true` if the literal has no text at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
