//! `ARG <name>[=<default>] ...`

use winnow::{Parser, combinator::opt};

use crate::{
    error::{Error, ParseError, Result},
    instruction as common,
    parse::{self, Input, PResult},
    token::{Aggregate, KeyValueToken, Token, aggregate_token},
};

/// Characters allowed in a build argument name.
pub(crate) fn is_arg_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Returns `true` if `name` can be declared with `ARG`.
pub fn is_arg_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_arg_name_char)
}

/// Declares one or more build arguments, each with an optional default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(ArgInstruction);

impl ArgInstruction {
    /// Parse an `ARG` instruction.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser for an `ARG` instruction.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let declaration = || parse::key_value(escape_char, is_arg_name_char, false);

            let mut tokens = parse::instruction_start("ARG").parse_next(input)?;
            tokens.append(&mut parse::required_arg(escape_char, "argument name", declaration()).parse_next(input)?);
            while let Some(mut next) = opt(parse::arg_tokens(escape_char, declaration())).parse_next(input)? {
                tokens.append(&mut next);
            }
            tokens.append(&mut parse::instruction_end(escape_char).parse_next(input)?);
            Ok(Self { tokens, escape_char })
        }
    }

    /// Build `ARG name[=value]` with the default escape char.
    pub fn new(name: &str, value: Option<&str>) -> Result<Self> {
        Self::create(&[(name, value)], '\\')
    }

    /// Build an `ARG` instruction declaring every `(name, default)` pair.
    pub fn create(declarations: &[(&str, Option<&str>)], escape_char: char) -> Result<Self> {
        if declarations.is_empty() {
            return Err(Error::invalid_argument("declarations", "at least one argument is required"));
        }
        let mut text = String::from("ARG");
        for (name, value) in declarations {
            let declaration = KeyValueToken::new(name, *value, escape_char)?;
            text.push(' ');
            text.push_str(&declaration.to_string());
        }
        Ok(Self::parse(&text, escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    /// The declarations in source order.
    pub fn declarations(&self) -> impl Iterator<Item = &KeyValueToken> {
        self.tokens.iter().filter_map(Token::as_key_value)
    }

    pub fn declarations_mut(&mut self) -> impl Iterator<Item = &mut KeyValueToken> {
        self.tokens.iter_mut().filter_map(Token::as_key_value_mut)
    }

    /// The declared names in source order.
    pub fn names(&self) -> Vec<String> {
        self.declarations().map(|arg| arg.key().to_string()).collect()
    }

    /// The declaration for `name`.
    pub fn declaration(&self, name: &str) -> Option<&KeyValueToken> {
        self.declarations().find(|arg| arg.key() == name)
    }

    /// Set or clear the default of the declaration named `name`.
    pub fn set_value(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let escape_char = self.escape_char;
        let declaration = self
            .declarations_mut()
            .find(|arg| arg.key() == name)
            .ok_or_else(|| Error::invalid_argument("name", format!("`{name}` is not declared")))?;
        declaration.set_value(value, escape_char)
    }

    /// Append a declaration.
    pub fn add_declaration(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let declaration = KeyValueToken::new(name, value, self.escape_char)?;
        self.set_token(None, Some(Token::KeyValue(declaration)), Some(&common::append_argument), None);
        Ok(())
    }

    /// Remove the declaration named `name`. The last declaration cannot be
    /// removed.
    pub fn remove_declaration(&mut self, name: &str) -> Result<()> {
        if self.declarations().count() < 2 {
            return Err(Error::invalid_argument("name", "an ARG instruction needs at least one declaration"));
        }
        let current = self.position(|token| token.as_key_value().is_some_and(|arg| arg.key() == name));
        if current.is_none() {
            return Err(Error::invalid_argument("name", format!("`{name}` is not declared")));
        }
        self.set_token(current, None, None, Some(&common::remove_with_leading_separators));
        Ok(())
    }
}
