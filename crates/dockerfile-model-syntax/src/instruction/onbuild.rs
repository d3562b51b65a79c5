//! `ONBUILD <instruction>`

use winnow::{Parser, stream::Location};

use crate::{
    error::{Error, ErrorCode, ParseError, Result},
    instruction::Instruction,
    parse::{self, Input, PResult},
    token::{Token, aggregate_token},
};

const FORBIDDEN_TRIGGERS: [&str; 3] = ["ONBUILD", "FROM", "MAINTAINER"];

/// Registers a trigger instruction to run when the image is used as a base.
///
/// The trigger is kept as a nested instruction token. Its variables are not
/// resolved while building this image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnBuildInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(OnBuildInstruction);

impl OnBuildInstruction {
    /// Parse an `ONBUILD` instruction.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser for an `ONBUILD` instruction.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let mut tokens = parse::instruction_start("ONBUILD").parse_next(input)?;
            tokens.append(&mut parse::separator(escape_char).parse_next(input).map_err(|_| {
                parse::expected_at(input, input.current_token_start(), "trigger instruction")
            })?);

            let offset = input.current_token_start();
            let trigger = Instruction::parser(escape_char).parse_next(input)?;
            if FORBIDDEN_TRIGGERS.contains(&trigger.name().as_str()) {
                return Err(parse::failure_at(
                    input,
                    offset,
                    ErrorCode::E107,
                    "instruction is not allowed as an ONBUILD trigger",
                ));
            }
            tokens.push(Token::from(trigger));
            Ok(Self { tokens, escape_char })
        }
    }

    /// Build `ONBUILD <trigger>`.
    pub fn create(trigger: &Instruction) -> Result<Self> {
        if FORBIDDEN_TRIGGERS.contains(&trigger.name().as_str()) {
            return Err(Error::invalid_argument(
                "trigger",
                format!("{} is not allowed as an ONBUILD trigger", trigger.name()),
            ));
        }
        let escape_char = trigger.escape_char();
        Ok(Self::parse(&format!("ONBUILD {}", trigger.to_string().trim_start()), escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    /// The deferred instruction.
    pub fn trigger(&self) -> Option<&Instruction> {
        self.tokens.iter().find_map(Token::as_instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_instruction() {
        let text = "ONBUILD COPY . /app/src\n";
        let onbuild = OnBuildInstruction::parse(text, '\\').unwrap();
        assert_eq!(onbuild.to_string(), text);
        let trigger = onbuild.trigger().unwrap();
        assert_eq!(trigger.name(), "COPY");
        assert_eq!(trigger.to_string(), "COPY . /app/src\n");
    }

    #[test]
    fn test_forbidden_triggers() {
        let err = OnBuildInstruction::parse("ONBUILD FROM alpine", '\\').unwrap_err();
        assert_eq!(err.code(), ErrorCode::E107);
        assert_eq!(err.column(), 9);

        assert!(OnBuildInstruction::parse("ONBUILD ONBUILD RUN x", '\\').is_err());
    }

    #[test]
    fn test_missing_trigger() {
        let err = OnBuildInstruction::parse("ONBUILD", '\\').unwrap_err();
        assert_eq!(err.message(), "expected trigger instruction");
    }

    #[test]
    fn test_create() {
        let trigger = Instruction::parse("RUN make", '\\').unwrap();
        let onbuild = OnBuildInstruction::create(&trigger).unwrap();
        assert_eq!(onbuild.to_string(), "ONBUILD RUN make");

        let from = Instruction::parse("FROM a", '\\').unwrap();
        assert!(OnBuildInstruction::create(&from).is_err());
    }
}
