//! `LABEL <key>=<value> ...`

use winnow::{Parser, combinator::opt};

use crate::{
    error::{Error, ParseError, Result},
    instruction as common,
    parse::{self, Input, PResult},
    token::{Aggregate, KeyValueToken, Token, aggregate_token},
};

/// Characters allowed in an unquoted label key.
fn is_label_key_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '"' | '\'' | '\\' | '`' | '$')
}

/// Attaches metadata to the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(LabelInstruction);

impl LabelInstruction {
    /// Parse a `LABEL` instruction.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser for a `LABEL` instruction.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let pair = || parse::key_value(escape_char, is_label_key_char, true);

            let mut tokens = parse::instruction_start("LABEL").parse_next(input)?;
            tokens.append(&mut parse::required_arg(escape_char, "label", pair()).parse_next(input)?);
            while let Some(mut next) = opt(parse::arg_tokens(escape_char, pair())).parse_next(input)? {
                tokens.append(&mut next);
            }
            tokens.append(&mut parse::instruction_end(escape_char).parse_next(input)?);
            Ok(Self { tokens, escape_char })
        }
    }

    /// Build `LABEL key=value ...`.
    pub fn create(labels: &[(&str, &str)], escape_char: char) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::invalid_argument("labels", "at least one label is required"));
        }
        let mut text = String::from("LABEL");
        for (key, value) in labels {
            text.push(' ');
            text.push_str(&KeyValueToken::new(key, Some(value), escape_char)?.to_string());
        }
        Ok(Self::parse(&text, escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    /// The label pairs in source order.
    pub fn labels(&self) -> impl Iterator<Item = &KeyValueToken> {
        self.tokens.iter().filter_map(Token::as_key_value)
    }

    /// The value of the label `key`.
    pub fn label(&self, key: &str) -> Option<String> {
        self.labels().find(|label| label.key() == key).and_then(KeyValueToken::value)
    }

    /// Set the label `key`, appending it when it does not exist yet.
    pub fn set_label(&mut self, key: &str, value: &str) -> Result<()> {
        let replacement = KeyValueToken::new(key, Some(value), self.escape_char)?;
        let current = self.position(|token| token.as_key_value().is_some_and(|label| label.key() == key));
        self.set_token(current, Some(Token::KeyValue(replacement)), Some(&common::append_argument), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_keys() {
        let text = "LABEL org.opencontainers.image.title=\"My App\" version=1.0\n";
        let label = LabelInstruction::parse(text, '\\').unwrap();
        assert_eq!(label.to_string(), text);
        assert_eq!(label.label("org.opencontainers.image.title").as_deref(), Some("My App"));
        assert_eq!(label.label("version").as_deref(), Some("1.0"));
    }

    #[test]
    fn test_requires_value() {
        assert!(LabelInstruction::parse("LABEL a", '\\').is_err());
    }

    #[test]
    fn test_set_label() {
        let mut label = LabelInstruction::parse("LABEL a=1\n", '\\').unwrap();
        label.set_label("a", "2").unwrap();
        label.set_label("b", "3").unwrap();
        assert_eq!(label.to_string(), "LABEL a=2 b=3\n");
    }
}
