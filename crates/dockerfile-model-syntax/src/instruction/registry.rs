//! Keyword to grammar lookup.

use winnow::Parser;

use crate::{
    instruction::{
        ArgInstruction, ArgumentStyle, CommandInstruction, EnvInstruction, FromInstruction, GenericInstruction,
        Instruction, LabelInstruction, OnBuildInstruction,
    },
    parse::{Input, PResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Grammar {
    From,
    Arg,
    Env,
    Label,
    Command,
    OnBuild,
    Generic(ArgumentStyle),
}

const WORDS_WITH_EXEC_FORM: ArgumentStyle = ArgumentStyle::Words {
    exec_form: true,
    variables: true,
};

const WORDS: ArgumentStyle = ArgumentStyle::Words {
    exec_form: false,
    variables: true,
};

const RAW_LINE: ArgumentStyle = ArgumentStyle::Line { variables: false };

static INSTRUCTIONS: &[(&str, Grammar)] = &[
    ("ADD", Grammar::Generic(WORDS_WITH_EXEC_FORM)),
    ("ARG", Grammar::Arg),
    ("CMD", Grammar::Command),
    ("COPY", Grammar::Generic(WORDS_WITH_EXEC_FORM)),
    ("ENTRYPOINT", Grammar::Command),
    ("ENV", Grammar::Env),
    ("EXPOSE", Grammar::Generic(WORDS)),
    ("FROM", Grammar::From),
    ("HEALTHCHECK", Grammar::Generic(RAW_LINE)),
    ("LABEL", Grammar::Label),
    ("MAINTAINER", Grammar::Generic(RAW_LINE)),
    ("ONBUILD", Grammar::OnBuild),
    ("RUN", Grammar::Command),
    ("SHELL", Grammar::Generic(ArgumentStyle::ExecForm)),
    ("STOPSIGNAL", Grammar::Generic(WORDS)),
    ("USER", Grammar::Generic(WORDS)),
    ("VOLUME", Grammar::Generic(WORDS_WITH_EXEC_FORM)),
    ("WORKDIR", Grammar::Generic(WORDS)),
];

/// The canonical keyword and grammar for `word`, matched case-insensitively.
pub(crate) fn lookup(word: &str) -> Option<(&'static str, Grammar)> {
    INSTRUCTIONS
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
        .copied()
}

/// The keyword and argument style of a generic instruction.
pub(crate) fn generic_style(word: &str) -> Option<(&'static str, ArgumentStyle)> {
    match lookup(word)? {
        (keyword, Grammar::Generic(style)) => Some((keyword, style)),
        _ => None,
    }
}

/// Returns `true` if `word` is a Dockerfile instruction keyword, in any case.
pub fn is_instruction(word: &str) -> bool {
    lookup(word).is_some()
}

/// All instruction keywords, in upper case.
pub fn instruction_names() -> impl Iterator<Item = &'static str> {
    INSTRUCTIONS.iter().map(|(keyword, _)| *keyword)
}

/// Parse the instruction selected by a [`lookup`] entry.
pub(crate) fn parse_instruction(
    (keyword, grammar): (&'static str, Grammar),
    escape_char: char,
    input: &mut Input<'_>,
) -> PResult<Instruction> {
    match grammar {
        Grammar::From => FromInstruction::parser(escape_char).map(Instruction::From).parse_next(input),
        Grammar::Arg => ArgInstruction::parser(escape_char).map(Instruction::Arg).parse_next(input),
        Grammar::Env => EnvInstruction::parser(escape_char).map(Instruction::Env).parse_next(input),
        Grammar::Label => LabelInstruction::parser(escape_char).map(Instruction::Label).parse_next(input),
        Grammar::Command => CommandInstruction::keyword_parser(keyword, escape_char)
            .map(Instruction::Command)
            .parse_next(input),
        Grammar::OnBuild => OnBuildInstruction::parser(escape_char)
            .map(Instruction::OnBuild)
            .parse_next(input),
        Grammar::Generic(style) => GenericInstruction::keyword_parser(keyword, style, escape_char)
            .map(Instruction::Generic)
            .parse_next(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("from").map(|(keyword, _)| keyword), Some("FROM"));
        assert_eq!(lookup("Run").map(|(_, grammar)| grammar), Some(Grammar::Command));
        assert!(lookup("FOO").is_none());
    }

    #[test]
    fn test_names() {
        assert_eq!(instruction_names().count(), 18);
        assert!(instruction_names().all(is_instruction));
    }

    #[test]
    fn test_generic_style() {
        assert_eq!(generic_style("copy").map(|(keyword, _)| keyword), Some("COPY"));
        assert!(generic_style("FROM").is_none());
    }
}
