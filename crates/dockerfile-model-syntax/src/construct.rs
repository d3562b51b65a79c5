//! Top-level items of a Dockerfile.

use std::fmt;

use winnow::{
    Parser,
    combinator::opt,
    stream::{Location, Stream},
    token::take_till,
};

use crate::{
    error::{Error, ErrorCode, ParseError, Result},
    instruction::Instruction,
    parse::{self, Input, PResult},
    token::{Aggregate, CommentToken, LeafKind, LiteralToken, Token, aggregate_token},
};

/// Directive names recognised at the top of a Dockerfile.
pub const DIRECTIVE_NAMES: [&str; 3] = ["syntax", "escape", "check"];

/// A single item of a [`Dockerfile`](crate::Dockerfile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construct {
    Instruction(Instruction),
    /// A full-line comment.
    Comment(CommentToken),
    /// One or more blank lines.
    Whitespace(Whitespace),
    /// A `# name=value` line before any other content.
    ParserDirective(ParserDirective),
}

impl Construct {
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Construct::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    pub fn as_instruction_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            Construct::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    pub fn as_parser_directive(&self) -> Option<&ParserDirective> {
        match self {
            Construct::ParserDirective(directive) => Some(directive),
            _ => None,
        }
    }
}

impl Aggregate for Construct {
    fn tokens(&self) -> &[Token] {
        match self {
            Construct::Instruction(item) => item.tokens(),
            Construct::Comment(item) => item.tokens(),
            Construct::Whitespace(item) => item.tokens(),
            Construct::ParserDirective(item) => item.tokens(),
        }
    }

    fn tokens_mut(&mut self) -> &mut Vec<Token> {
        match self {
            Construct::Instruction(item) => item.tokens_mut(),
            Construct::Comment(item) => item.tokens_mut(),
            Construct::Whitespace(item) => item.tokens_mut(),
            Construct::ParserDirective(item) => item.tokens_mut(),
        }
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::Instruction(item) => fmt::Display::fmt(item, f),
            Construct::Comment(item) => fmt::Display::fmt(item, f),
            Construct::Whitespace(item) => fmt::Display::fmt(item, f),
            Construct::ParserDirective(item) => fmt::Display::fmt(item, f),
        }
    }
}

impl From<Instruction> for Construct {
    fn from(instruction: Instruction) -> Self {
        Construct::Instruction(instruction)
    }
}

impl From<CommentToken> for Construct {
    fn from(comment: CommentToken) -> Self {
        Construct::Comment(comment)
    }
}

impl From<ParserDirective> for Construct {
    fn from(directive: ParserDirective) -> Self {
        Construct::ParserDirective(directive)
    }
}

/// Consecutive blank lines, each optionally indented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitespace {
    tokens: Vec<Token>,
}

aggregate_token!(Whitespace);

impl Whitespace {
    /// `count` empty lines.
    pub fn new(count: usize) -> Self {
        Self {
            tokens: (0..count).map(|_| Token::newline("\n")).collect(),
        }
    }

    /// A parser for one or more blank lines, or trailing whitespace at the
    /// end of the input.
    pub fn parser<'a>() -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let mut tokens = Vec::new();
            while let Some(mut line) = opt(parse::blank_line).parse_next(input)? {
                tokens.append(&mut line);
            }
            let checkpoint = input.checkpoint();
            if let Some(ws) = opt(parse::whitespace).parse_next(input)? {
                if input.is_empty() {
                    tokens.push(ws);
                } else {
                    input.reset(&checkpoint);
                }
            }
            if tokens.is_empty() {
                return parse::backtrack();
            }
            Ok(Self { tokens })
        }
    }

    /// The number of line breaks.
    pub fn line_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| token.leaf_kind() == Some(LeafKind::NewLine))
            .count()
    }
}

/// A parser directive such as `# escape=`` ` ``.
///
/// Children: optional indentation, the `#` marker, optional whitespace, the
/// name, optional whitespace, `=`, optional whitespace, the value literal,
/// optional trailing whitespace and the newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserDirective {
    tokens: Vec<Token>,
}

aggregate_token!(ParserDirective);

impl ParserDirective {
    /// Parse a single directive line.
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser())
    }

    /// A parser for a directive line. Lines that are not directives, or
    /// name an unknown directive, backtrack.
    pub fn parser<'a>() -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let checkpoint = input.checkpoint();
            match scan_directive(input) {
                Err(winnow::error::ErrMode::Backtrack(e)) => {
                    input.reset(&checkpoint);
                    Err(winnow::error::ErrMode::Backtrack(e))
                }
                other => other,
            }
        }
    }

    /// Build `# name=value`.
    pub fn create(name: &str, value: &str) -> Result<Self> {
        if !DIRECTIVE_NAMES.iter().any(|known| known.eq_ignore_ascii_case(name)) {
            return Err(Error::invalid_argument("name", format!("`{name}` is not a parser directive")));
        }
        if value.trim().is_empty() || value.contains(['\r', '\n']) {
            return Err(Error::invalid_argument("value", "value must be a non-empty single line"));
        }
        Ok(Self::parse(&format!("# {name}={value}\n"))?)
    }

    /// The directive name as written.
    pub fn name(&self) -> &str {
        self.tokens
            .iter()
            .filter_map(Token::as_leaf)
            .find(|leaf| leaf.kind() == LeafKind::Identifier)
            .map(|leaf| leaf.text())
            .unwrap_or_default()
    }

    pub fn value_token(&self) -> Option<&LiteralToken> {
        self.tokens.iter().find_map(Token::as_literal)
    }

    /// The directive value.
    pub fn value(&self) -> String {
        self.value_token().map(LiteralToken::value).unwrap_or_default()
    }

    /// Replace the value, keeping the surrounding layout.
    pub fn set_value(&mut self, value: &str) -> Result<()> {
        let replacement = Self::create(self.name(), value)?
            .value_token()
            .cloned()
            .ok_or_else(|| Error::invalid_argument("value", "value must not be empty"))?;
        let current = self.position(|token| matches!(token, Token::Literal(_)));
        self.set_token(current, Some(Token::Literal(replacement)), None, None);
        Ok(())
    }

    /// The escape char selected by an `escape` directive.
    pub fn escape_char(&self) -> Option<char> {
        if !self.name().eq_ignore_ascii_case("escape") {
            return None;
        }
        self.value().chars().next()
    }
}

fn scan_directive(input: &mut Input<'_>) -> PResult<ParserDirective> {
    let mut tokens = Vec::new();
    if let Some(ws) = opt(parse::whitespace).parse_next(input)? {
        tokens.push(ws);
    }
    '#'.parse_next(input)?;
    tokens.push(Token::leaf(LeafKind::CommentMarker, "#"));
    if let Some(ws) = opt(parse::whitespace).parse_next(input)? {
        tokens.push(ws);
    }

    let name = parse::identifier(parse::is_name_char).parse_next(input)?;
    let known = name
        .as_leaf()
        .is_some_and(|leaf| DIRECTIVE_NAMES.iter().any(|known| known.eq_ignore_ascii_case(leaf.text())));
    if !known {
        return parse::backtrack();
    }
    let is_escape = name
        .as_leaf()
        .is_some_and(|leaf| leaf.text().eq_ignore_ascii_case("escape"));
    tokens.push(name);

    if let Some(ws) = opt(parse::whitespace).parse_next(input)? {
        tokens.push(ws);
    }
    '='.parse_next(input)?;
    tokens.push(Token::symbol("="));
    if let Some(ws) = opt(parse::whitespace).parse_next(input)? {
        tokens.push(ws);
    }

    let offset = input.current_token_start();
    let rest: &str = take_till(0.., ['\r', '\n']).parse_next(input)?;
    let value = rest.trim_end_matches(parse::is_blank);
    if value.is_empty() {
        return parse::backtrack();
    }
    if is_escape && value != "\\" && value != "`" {
        return Err(parse::failure_at(
            input,
            offset,
            ErrorCode::E106,
            "escape directive must be a backslash or a backtick",
        ));
    }
    tokens.push(Token::Literal(LiteralToken::from_tokens(vec![Token::fragment(value)], false)));
    let trailing = &rest[value.len()..];
    if !trailing.is_empty() {
        tokens.push(Token::whitespace(trailing));
    }
    if let Some(nl) = opt(parse::newline).parse_next(input)? {
        tokens.push(nl);
    }
    Ok(ParserDirective { tokens })
}

/// A parser for any construct after the directive section.
pub(crate) fn construct<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Construct> {
    move |input: &mut Input<'a>| {
        if let Some(whitespace) = opt(Whitespace::parser()).parse_next(input)? {
            return Ok(Construct::Whitespace(whitespace));
        }
        if let Some(comment) = opt(parse::comment_line).parse_next(input)? {
            return Ok(Construct::Comment(comment));
        }
        Instruction::parser(escape_char)
            .map(Construct::Instruction)
            .parse_next(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directive() {
        let text = "#  escape = `  \n";
        let directive = ParserDirective::parse(text).unwrap();
        assert_eq!(directive.to_string(), text);
        assert_eq!(directive.name(), "escape");
        assert_eq!(directive.value(), "`");
        assert_eq!(directive.escape_char(), Some('`'));
    }

    #[test]
    fn test_backslash_escape_is_not_a_continuation() {
        let directive = ParserDirective::parse("# escape=\\\n").unwrap();
        assert_eq!(directive.escape_char(), Some('\\'));
    }

    #[test]
    fn test_invalid_escape_value() {
        let err = ParserDirective::parse("# escape=x").unwrap_err();
        assert_eq!(err.code(), ErrorCode::E106);
        assert_eq!(err.column(), 10);
    }

    #[test]
    fn test_unknown_directive_is_not_a_directive() {
        assert!(ParserDirective::parse("# foo=bar").is_err());
        assert!(ParserDirective::parse("# just a comment").is_err());
    }

    #[test]
    fn test_create_and_set_value() {
        let mut directive = ParserDirective::create("syntax", "docker/dockerfile:1").unwrap();
        assert_eq!(directive.to_string(), "# syntax=docker/dockerfile:1\n");
        directive.set_value("docker/dockerfile:1.7").unwrap();
        assert_eq!(directive.to_string(), "# syntax=docker/dockerfile:1.7\n");
        assert!(ParserDirective::create("nope", "x").is_err());
    }

    #[test]
    fn test_whitespace_construct() {
        let mut input = Input::new("\n  \n\nFROM a");
        let whitespace = Whitespace::parser().parse_next(&mut input).unwrap();
        assert_eq!(whitespace.to_string(), "\n  \n\n");
        assert_eq!(whitespace.line_count(), 3);
        assert_eq!(Whitespace::new(2).to_string(), "\n\n");
    }

    #[test]
    fn test_construct_dispatch() {
        let mut input = Input::new("# note\nRUN make\n");
        let comment = construct('\\').parse_next(&mut input).unwrap();
        assert!(matches!(comment, Construct::Comment(_)));
        let run = construct('\\').parse_next(&mut input).unwrap();
        assert_eq!(run.as_instruction().map(Instruction::name).as_deref(), Some("RUN"));
    }
}
