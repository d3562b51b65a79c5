//! `FROM [--platform=<platform>] <image> [AS <name>]`

use winnow::{Parser, combinator::opt};

use crate::{
    error::{Error, ParseError, Result},
    instruction as common,
    parse::{self, Input, LiteralGrammar, PResult},
    token::{Aggregate, KeyValueToken, LeafKind, LiteralToken, Token, aggregate_token},
};

/// Characters allowed in a stage name.
fn is_stage_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Starts a build stage from a base image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(FromInstruction);

impl FromInstruction {
    /// Parse a `FROM` instruction.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser for a `FROM` instruction.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let mut tokens = parse::instruction_start("FROM").parse_next(input)?;
            if let Some(mut flag) = opt(parse::arg_tokens(escape_char, parse::flag(escape_char))).parse_next(input)? {
                tokens.append(&mut flag);
            }
            tokens.append(
                &mut parse::required_arg(
                    escape_char,
                    "image name",
                    parse::literal_token(escape_char, LiteralGrammar::WORD),
                )
                .parse_next(input)?,
            );
            if let Some(mut keyword) = opt(parse::arg_tokens(escape_char, parse::keyword("AS"))).parse_next(input)? {
                tokens.append(&mut keyword);
                tokens.append(
                    &mut parse::required_arg(escape_char, "stage name", parse::identifier(is_stage_char))
                        .parse_next(input)?,
                );
            }
            tokens.append(&mut parse::instruction_end(escape_char).parse_next(input)?);
            Ok(Self { tokens, escape_char })
        }
    }

    /// Build a `FROM` instruction with the default escape char.
    pub fn new(image_name: &str) -> Result<Self> {
        Self::create(image_name, None, None, '\\')
    }

    /// Build a `FROM` instruction. The text is assembled and then parsed,
    /// so the result is identical to parsing the same line.
    pub fn create(
        image_name: &str,
        stage_name: Option<&str>,
        platform: Option<&str>,
        escape_char: char,
    ) -> Result<Self> {
        if image_name.is_empty() {
            return Err(Error::invalid_argument("image_name", "value must not be empty"));
        }
        let mut text = String::from("FROM ");
        if let Some(platform) = platform {
            text.push_str(&format!("--platform={platform} "));
        }
        text.push_str(image_name);
        if let Some(stage_name) = stage_name {
            text.push_str(&format!(" AS {stage_name}"));
        }
        Ok(Self::parse(&text, escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    fn image_index(&self) -> Option<usize> {
        self.position(|token| matches!(token, Token::Literal(_)))
    }

    /// The image reference literal.
    pub fn image_name_token(&self) -> Option<&LiteralToken> {
        self.tokens.iter().find_map(Token::as_literal)
    }

    pub fn image_name_token_mut(&mut self) -> Option<&mut LiteralToken> {
        self.tokens.iter_mut().find_map(Token::as_literal_mut)
    }

    /// The image reference as written, without quotes.
    pub fn image_name(&self) -> String {
        self.image_name_token().map(LiteralToken::value).unwrap_or_default()
    }

    /// Replace the image reference.
    pub fn set_image_name(&mut self, image_name: &str) -> Result<()> {
        let literal = LiteralToken::create("image_name", image_name, self.escape_char, LiteralGrammar::WORD)?;
        self.set_image_name_token(literal);
        Ok(())
    }

    pub fn set_image_name_token(&mut self, literal: LiteralToken) {
        let current = self.image_index();
        self.set_token(current, Some(Token::Literal(literal)), None, None);
    }

    /// The `--platform` flag.
    pub fn platform_token(&self) -> Option<&KeyValueToken> {
        common::flag_index(&self.tokens, "platform").and_then(|index| self.tokens[index].as_key_value())
    }

    /// The value of the `--platform` flag.
    pub fn platform(&self) -> Option<String> {
        self.platform_token().and_then(KeyValueToken::value)
    }

    /// Set or remove the `--platform` flag.
    pub fn set_platform(&mut self, platform: Option<&str>) -> Result<()> {
        let replacement = platform
            .map(|value| {
                if value.is_empty() {
                    return Err(Error::invalid_argument("platform", "value must not be empty"));
                }
                KeyValueToken::flag("platform", Some(value), self.escape_char)
            })
            .transpose()?;
        self.set_platform_token(replacement);
        Ok(())
    }

    pub fn set_platform_token(&mut self, platform: Option<KeyValueToken>) {
        let current = common::flag_index(&self.tokens, "platform");
        self.set_token(
            current,
            platform.map(Token::KeyValue),
            Some(&common::insert_after_keyword),
            Some(&common::remove_with_leading_separators),
        );
    }

    fn stage_name_index(&self) -> Option<usize> {
        self.position(|token| token.leaf_kind() == Some(LeafKind::Identifier))
    }

    /// The stage name given with `AS`.
    pub fn stage_name(&self) -> Option<String> {
        self.stage_name_index()
            .and_then(|index| self.tokens[index].as_leaf())
            .map(|leaf| leaf.text().to_string())
    }

    /// Set, rename or remove the stage name. Removal also drops `AS`.
    pub fn set_stage_name(&mut self, stage_name: Option<&str>) -> Result<()> {
        if let Some(name) = stage_name.filter(|name| name.is_empty() || !name.chars().all(is_stage_char)) {
            return Err(Error::invalid_argument("stage_name", format!("`{name}` is not a valid stage name")));
        }
        let current = self.stage_name_index();
        self.set_token(
            current,
            stage_name.map(Token::identifier),
            Some(&append_stage_name),
            Some(&remove_stage_name),
        );
        Ok(())
    }
}

fn append_stage_name(tokens: &mut Vec<Token>, name: Token) {
    let index = common::content_end(tokens);
    tokens.splice(
        index..index,
        [Token::whitespace(" "), Token::keyword("AS"), Token::whitespace(" "), name],
    );
}

fn remove_stage_name(tokens: &mut Vec<Token>, index: usize) {
    let image = tokens
        .iter()
        .position(|token| matches!(token, Token::Literal(_)))
        .unwrap_or(index);
    // Everything between the image and the name belongs to the `AS` clause.
    tokens.drain(image + 1..=index);
}
