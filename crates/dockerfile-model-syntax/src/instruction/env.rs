//! `ENV <key>=<value> ...` and the legacy `ENV <key> <value>` form.

use winnow::{Parser, combinator::opt};

use crate::{
    error::{Error, ParseError, Result},
    instruction::arg::is_arg_name_char,
    parse::{self, Input, LiteralGrammar, PResult},
    token::{KeyValueToken, LeafKind, LiteralToken, Token, aggregate_token},
};

/// Sets environment variables for the rest of the stage.
///
/// In the legacy form the key is an identifier child of the instruction and
/// the value is the rest of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(EnvInstruction);

impl EnvInstruction {
    /// Parse an `ENV` instruction.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser for an `ENV` instruction.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let pair = || parse::key_value(escape_char, is_arg_name_char, true);

            let mut tokens = parse::instruction_start("ENV").parse_next(input)?;
            if let Some(mut first) = opt(parse::arg_tokens(escape_char, pair())).parse_next(input)? {
                tokens.append(&mut first);
                while let Some(mut next) = opt(parse::arg_tokens(escape_char, pair())).parse_next(input)? {
                    tokens.append(&mut next);
                }
            } else {
                tokens.append(
                    &mut parse::required_arg(escape_char, "variable name", parse::identifier(is_arg_name_char))
                        .parse_next(input)?,
                );
                tokens.append(
                    &mut parse::required_arg(
                        escape_char,
                        "variable value",
                        parse::literal_token(escape_char, LiteralGrammar::LINE),
                    )
                    .parse_next(input)?,
                );
            }
            tokens.append(&mut parse::instruction_end(escape_char).parse_next(input)?);
            Ok(Self { tokens, escape_char })
        }
    }

    /// Build `ENV key=value ...`.
    pub fn create(variables: &[(&str, &str)], escape_char: char) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::invalid_argument("variables", "at least one variable is required"));
        }
        let mut text = String::from("ENV");
        for (key, value) in variables {
            let pair = KeyValueToken::new(key, Some(value), escape_char)?;
            text.push(' ');
            text.push_str(&pair.to_string());
        }
        Ok(Self::parse(&text, escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    /// Whether the instruction uses the legacy `ENV key value` form.
    pub fn is_legacy_form(&self) -> bool {
        self.tokens.iter().any(|token| token.leaf_kind() == Some(LeafKind::Identifier))
    }

    /// The `key=value` pairs. Empty in the legacy form.
    pub fn pairs(&self) -> impl Iterator<Item = &KeyValueToken> {
        self.tokens.iter().filter_map(Token::as_key_value)
    }

    /// The assigned variables in source order, values without quotes.
    pub fn variables(&self) -> Vec<(String, String)> {
        if self.is_legacy_form() {
            let key = self
                .tokens
                .iter()
                .filter_map(Token::as_leaf)
                .find(|leaf| leaf.kind() == LeafKind::Identifier)
                .map(|leaf| leaf.text().to_string())
                .unwrap_or_default();
            let value = self.tokens.iter().find_map(Token::as_literal).map(LiteralToken::value);
            return vec![(key, value.unwrap_or_default())];
        }
        self.pairs()
            .map(|pair| (pair.key().to_string(), pair.value().unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs() {
        let text = "ENV A=1 \\\n    B=\"two words\"\n";
        let env = EnvInstruction::parse(text, '\\').unwrap();
        assert_eq!(env.to_string(), text);
        assert!(!env.is_legacy_form());
        assert_eq!(
            env.variables(),
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two words".to_string())
            ]
        );
    }

    #[test]
    fn test_legacy_form() {
        let text = "ENV PATH /usr/local/bin:$PATH  \n";
        let env = EnvInstruction::parse(text, '\\').unwrap();
        assert_eq!(env.to_string(), text);
        assert!(env.is_legacy_form());
        assert_eq!(
            env.variables(),
            vec![("PATH".to_string(), "/usr/local/bin:$PATH".to_string())]
        );
    }

    #[test]
    fn test_legacy_form_requires_value() {
        let err = EnvInstruction::parse("ENV A", '\\').unwrap_err();
        assert_eq!(err.message(), "expected variable value");
    }

    #[test]
    fn test_create() {
        let env = EnvInstruction::create(&[("A", "1"), ("B", "")], '\\').unwrap();
        assert_eq!(env.to_string(), "ENV A=1 B=");
    }
}
