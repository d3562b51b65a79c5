//! `key=value` pairs and `--flag[=value]` options.

use crate::{
    error::{Error, Result},
    parse::LiteralGrammar,
    token::{Aggregate, LeafKind, LiteralToken, Token, aggregate_token, remove_range},
};

/// A key with an optional value.
///
/// Children: an optional `--` symbol (for instruction flags), the key
/// identifier, and, when a value is present, the `=` symbol followed by the
/// value literal. The value literal may be empty (`ARG NAME=`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueToken {
    tokens: Vec<Token>,
}

aggregate_token!(KeyValueToken);

impl KeyValueToken {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Build `key` or `key=value`.
    pub fn new(key: &str, value: Option<&str>, escape_char: char) -> Result<Self> {
        Self::build(None, key, value, escape_char)
    }

    /// Build `--name` or `--name=value`.
    pub fn flag(name: &str, value: Option<&str>, escape_char: char) -> Result<Self> {
        Self::build(Some(Token::symbol("--")), name, value, escape_char)
    }

    fn build(prefix: Option<Token>, key: &str, value: Option<&str>, escape_char: char) -> Result<Self> {
        if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == '=') {
            return Err(Error::invalid_argument("key", format!("`{key}` is not a valid key")));
        }
        let mut tokens: Vec<Token> = prefix.into_iter().collect();
        tokens.push(Token::identifier(key));
        if let Some(value) = value {
            tokens.push(Token::symbol("="));
            tokens.push(Token::Literal(LiteralToken::create(
                "value",
                value,
                escape_char,
                LiteralGrammar::VALUE,
            )?));
        }
        Ok(Self::from_tokens(tokens))
    }

    /// Whether this is an instruction flag (`--name`).
    pub fn is_flag(&self) -> bool {
        self.tokens.first().is_some_and(|token| token.is_leaf(LeafKind::Symbol, "--"))
    }

    /// The key, without the `--` prefix.
    pub fn key(&self) -> &str {
        self.tokens
            .iter()
            .filter_map(Token::as_leaf)
            .find(|leaf| leaf.kind() == LeafKind::Identifier)
            .map(|leaf| leaf.text())
            .unwrap_or_default()
    }

    /// Rename the key, keeping the value and its formatting.
    pub fn set_key(&mut self, key: &str) -> Result<()> {
        if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == '=') {
            return Err(Error::invalid_argument("key", format!("`{key}` is not a valid key")));
        }
        let current = self.position(|token| token.leaf_kind() == Some(LeafKind::Identifier));
        self.set_token(current, Some(Token::identifier(key)), None, None);
        Ok(())
    }

    /// Whether an `=` and a value follow the key.
    pub fn has_value(&self) -> bool {
        self.value_token().is_some()
    }

    /// The value text without quotes, if a value is present.
    pub fn value(&self) -> Option<String> {
        self.value_token().map(LiteralToken::value)
    }

    pub fn value_token(&self) -> Option<&LiteralToken> {
        self.tokens.iter().find_map(Token::as_literal)
    }

    pub fn value_token_mut(&mut self) -> Option<&mut LiteralToken> {
        self.tokens.iter_mut().find_map(Token::as_literal_mut)
    }

    /// Set or clear the value.
    ///
    /// Clearing removes the `=` together with the value; setting a value on
    /// a bare key inserts both.
    pub fn set_value(&mut self, value: Option<&str>, escape_char: char) -> Result<()> {
        let replacement = value
            .map(|value| LiteralToken::create("value", value, escape_char, LiteralGrammar::VALUE))
            .transpose()?;
        self.set_value_token(replacement);
        Ok(())
    }

    /// Set or clear the value literal.
    pub fn set_value_token(&mut self, value: Option<LiteralToken>) {
        let current = self.position(|token| matches!(token, Token::Literal(_)));
        self.set_token(
            current,
            value.map(Token::Literal),
            Some(&append_with_equals),
            Some(&remove_with_equals),
        );
    }
}

fn append_with_equals(tokens: &mut Vec<Token>, value: Token) {
    tokens.push(Token::symbol("="));
    tokens.push(value);
}

fn remove_with_equals(tokens: &mut Vec<Token>, index: usize) {
    let equals = tokens
        .iter()
        .position(|token| token.is_leaf(LeafKind::Symbol, "="))
        .unwrap_or(index);
    remove_range(tokens, equals, index);
}
