//! Dockerfile instructions.
//!
//! Every instruction is an aggregate of tokens starting with optional
//! indentation and its keyword, followed by its arguments and the separators
//! between them, and ending with the newline (absent on the last line of a
//! file). Concrete types expose typed accessors over those tokens; edits go
//! through [`Aggregate::set_token`] so untouched formatting survives.

mod arg;
mod command;
mod env;
mod from;
mod generic;
mod label;
mod onbuild;
mod registry;

pub use arg::{ArgInstruction, is_arg_name};
pub use command::CommandInstruction;
pub use env::EnvInstruction;
pub use from::FromInstruction;
pub use generic::{ArgumentStyle, GenericInstruction};
pub use label::LabelInstruction;
pub use onbuild::OnBuildInstruction;
pub use registry::{instruction_names, is_instruction};

use winnow::{
    Parser,
    combinator::opt,
    stream::{Location, Stream},
    token::take_while,
};

use crate::{
    error::{ErrorCode, ParseError},
    parse::{self, Input, PResult},
    token::{Aggregate, KeyValueToken, LeafKind, Token},
};

/// Any Dockerfile instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    From(FromInstruction),
    Arg(ArgInstruction),
    Env(EnvInstruction),
    Label(LabelInstruction),
    /// `RUN`, `CMD` or `ENTRYPOINT`.
    Command(CommandInstruction),
    OnBuild(OnBuildInstruction),
    /// Every other instruction.
    Generic(GenericInstruction),
}

impl Instruction {
    /// Parse a single instruction of any kind.
    pub fn parse(text: &str, escape_char: char) -> Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser for a single instruction, dispatching on its keyword.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let checkpoint = input.checkpoint();
            opt(parse::whitespace).parse_next(input)?;
            let offset = input.current_token_start();
            let word: &str = take_while(0.., parse::is_name_char).parse_next(input)?;
            let entry = registry::lookup(word);
            input.reset(&checkpoint);

            match entry {
                _ if word.is_empty() => Err(parse::expected_at(input, offset, "instruction")),
                Some(entry) => registry::parse_instruction(entry, escape_char, input),
                None => Err(parse::failure_at(input, offset, ErrorCode::E102, "unknown instruction")),
            }
        }
    }

    /// The keyword as written in the source.
    pub fn keyword(&self) -> &str {
        keyword_token(self.tokens())
            .and_then(Token::as_leaf)
            .map(|leaf| leaf.text())
            .unwrap_or_default()
    }

    /// The keyword in upper case.
    pub fn name(&self) -> String {
        self.keyword().to_ascii_uppercase()
    }

    /// The escape char the instruction was parsed or built with.
    pub fn escape_char(&self) -> char {
        match self {
            Instruction::From(i) => i.escape_char(),
            Instruction::Arg(i) => i.escape_char(),
            Instruction::Env(i) => i.escape_char(),
            Instruction::Label(i) => i.escape_char(),
            Instruction::Command(i) => i.escape_char(),
            Instruction::OnBuild(i) => i.escape_char(),
            Instruction::Generic(i) => i.escape_char(),
        }
    }

    pub fn as_from(&self) -> Option<&FromInstruction> {
        match self {
            Instruction::From(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_from_mut(&mut self) -> Option<&mut FromInstruction> {
        match self {
            Instruction::From(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_arg(&self) -> Option<&ArgInstruction> {
        match self {
            Instruction::Arg(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_arg_mut(&mut self) -> Option<&mut ArgInstruction> {
        match self {
            Instruction::Arg(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_env(&self) -> Option<&EnvInstruction> {
        match self {
            Instruction::Env(i) => Some(i),
            _ => None,
        }
    }
}

impl Aggregate for Instruction {
    fn tokens(&self) -> &[Token] {
        match self {
            Instruction::From(i) => i.tokens(),
            Instruction::Arg(i) => i.tokens(),
            Instruction::Env(i) => i.tokens(),
            Instruction::Label(i) => i.tokens(),
            Instruction::Command(i) => i.tokens(),
            Instruction::OnBuild(i) => i.tokens(),
            Instruction::Generic(i) => i.tokens(),
        }
    }

    fn tokens_mut(&mut self) -> &mut Vec<Token> {
        match self {
            Instruction::From(i) => i.tokens_mut(),
            Instruction::Arg(i) => i.tokens_mut(),
            Instruction::Env(i) => i.tokens_mut(),
            Instruction::Label(i) => i.tokens_mut(),
            Instruction::Command(i) => i.tokens_mut(),
            Instruction::OnBuild(i) => i.tokens_mut(),
            Instruction::Generic(i) => i.tokens_mut(),
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.tokens()
            .iter()
            .try_for_each(|token| std::fmt::Display::fmt(token, f))
    }
}

/// The leading keyword token of an instruction.
fn keyword_token(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().find(|token| token.leaf_kind() == Some(LeafKind::Keyword))
}

/// Index of the instruction keyword, or 0 when there is none.
pub(crate) fn keyword_index(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .position(|token| token.leaf_kind() == Some(LeafKind::Keyword))
        .unwrap_or(0)
}

/// Index just past the last argument, before trailing separators and the
/// newline.
pub(crate) fn content_end(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .rposition(|token| !token.is_trivia())
        .map_or(0, |index| index + 1)
}

/// Insert `token` as the first argument, preceded by a space.
pub(crate) fn insert_after_keyword(tokens: &mut Vec<Token>, token: Token) {
    let index = keyword_index(tokens) + 1;
    tokens.splice(index..index, [Token::whitespace(" "), token]);
}

/// Insert `token` as the last argument, preceded by a space.
pub(crate) fn append_argument(tokens: &mut Vec<Token>, token: Token) {
    let index = content_end(tokens);
    tokens.splice(index..index, [Token::whitespace(" "), token]);
}

/// Remove the token at `index` together with the separators before it,
/// back to the previous argument or the keyword. Continuations and the
/// comments and blank lines they carry go with it, so no escape is left
/// dangling at the end of the instruction.
pub(crate) fn remove_with_leading_separators(tokens: &mut Vec<Token>, index: usize) {
    let start = tokens[..index]
        .iter()
        .rposition(|token| !token.is_trivia())
        .map_or(0, |previous| previous + 1);
    tokens.drain(start..=index);
}

/// Flags (`--name[=value]`) directly following the keyword.
pub(crate) fn flags(tokens: &[Token]) -> impl Iterator<Item = &KeyValueToken> {
    tokens
        .iter()
        .filter_map(Token::as_key_value)
        .filter(|key_value| key_value.is_flag())
}

/// Index of the flag named `name`, matched case-insensitively.
pub(crate) fn flag_index(tokens: &[Token], name: &str) -> Option<usize> {
    tokens.iter().position(|token| {
        token
            .as_key_value()
            .is_some_and(|flag| flag.is_flag() && flag.key().eq_ignore_ascii_case(name))
    })
}

/// Index just past the last flag, or just past the keyword.
pub(crate) fn flags_end(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .rposition(|token| token.as_key_value().is_some_and(KeyValueToken::is_flag))
        .map_or_else(|| keyword_index(tokens) + 1, |index| index + 1)
}

/// Insert a flag after any existing flags.
pub(crate) fn insert_flag(tokens: &mut Vec<Token>, token: Token) {
    let index = flags_end(tokens);
    tokens.splice(index..index, [Token::whitespace(" "), token]);
}

/// Leading flags of an instruction, each preceded by its separator.
pub(crate) fn parse_flags(escape: char, input: &mut Input<'_>) -> PResult<Vec<Token>> {
    let mut tokens = Vec::new();
    while let Some(mut flag) = opt(parse::arg_tokens(escape, parse::flag(escape))).parse_next(input)? {
        tokens.append(&mut flag);
    }
    Ok(tokens)
}
