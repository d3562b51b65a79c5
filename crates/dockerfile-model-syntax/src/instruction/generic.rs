//! Instructions that only need flags and a list of arguments: `ADD`, `COPY`,
//! `VOLUME`, `EXPOSE`, `USER`, `WORKDIR`, `STOPSIGNAL`, `SHELL`,
//! `HEALTHCHECK` and `MAINTAINER`.

use winnow::{Parser, combinator::opt, stream::Stream, token::take_while};

use crate::{
    error::{Error, ParseError, Result},
    instruction::{self as common, registry},
    parse::{self, Input, LiteralGrammar, PResult},
    token::{Aggregate, ExecFormToken, KeyValueToken, LiteralToken, Token, aggregate_token},
};

/// How the arguments after the flags are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStyle {
    /// Whitespace-separated words, or a single exec-form array when
    /// `exec_form` is set.
    Words { exec_form: bool, variables: bool },
    /// The rest of the line as one literal.
    Line { variables: bool },
    /// A single exec-form array.
    ExecForm,
}

/// An instruction made of a keyword, flags and plain arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(GenericInstruction);

impl GenericInstruction {
    /// Parse one of the generic instructions.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser accepting any of the generic instruction keywords.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let checkpoint = input.checkpoint();
            opt(parse::whitespace).parse_next(input)?;
            let word: &str = take_while(0.., parse::is_name_char).parse_next(input)?;
            let style = registry::generic_style(word);
            input.reset(&checkpoint);
            match style {
                Some((keyword, style)) => Self::keyword_parser(keyword, style, escape_char).parse_next(input),
                None => parse::backtrack(),
            }
        }
    }

    pub(crate) fn keyword_parser<'a>(
        keyword: &'static str,
        style: ArgumentStyle,
        escape_char: char,
    ) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let mut tokens = parse::instruction_start(keyword).parse_next(input)?;
            tokens.append(&mut common::parse_flags(escape_char, input)?);
            tokens.append(&mut parse_arguments(style, escape_char, input)?);
            tokens.append(&mut parse::instruction_end(escape_char).parse_next(input)?);
            Ok(Self { tokens, escape_char })
        }
    }

    /// Build `<keyword> <arguments...>`. Each argument must be a single word
    /// (quote it to include whitespace).
    pub fn create(keyword: &str, arguments: &[&str], escape_char: char) -> Result<Self> {
        let Some((keyword, _)) = registry::generic_style(keyword) else {
            return Err(Error::invalid_argument("keyword", format!("`{keyword}` is not a generic instruction")));
        };
        if arguments.is_empty() {
            return Err(Error::invalid_argument("arguments", "at least one argument is required"));
        }
        Ok(Self::parse(&format!("{keyword} {}", arguments.join(" ")), escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    /// The argument literals after the flags. For the exec form these are
    /// the array elements.
    pub fn arguments(&self) -> Vec<&LiteralToken> {
        match self.exec_form() {
            Some(exec_form) => exec_form.elements().collect(),
            None => self.tokens.iter().filter_map(Token::as_literal).collect(),
        }
    }

    /// The argument values, without quotes.
    pub fn argument_values(&self) -> Vec<String> {
        match self.exec_form() {
            Some(exec_form) => exec_form.values(),
            None => self.arguments().into_iter().map(LiteralToken::value).collect(),
        }
    }

    /// The exec-form arguments, if used.
    pub fn exec_form(&self) -> Option<&ExecFormToken> {
        self.tokens.iter().find_map(Token::as_exec_form)
    }

    /// All flags in source order.
    pub fn flags(&self) -> impl Iterator<Item = &KeyValueToken> {
        common::flags(&self.tokens)
    }

    /// The flag named `name`.
    pub fn flag(&self, name: &str) -> Option<&KeyValueToken> {
        common::flag_index(&self.tokens, name).and_then(|index| self.tokens[index].as_key_value())
    }

    /// Set, replace or remove the flag named `name`. A `Some(None)` value
    /// sets a bare flag such as `--link`.
    pub fn set_flag(&mut self, name: &str, value: Option<Option<&str>>) -> Result<()> {
        let replacement = value
            .map(|value| KeyValueToken::flag(name, value, self.escape_char))
            .transpose()?;
        let current = common::flag_index(&self.tokens, name);
        self.set_token(
            current,
            replacement.map(Token::KeyValue),
            Some(&common::insert_flag),
            Some(&common::remove_with_leading_separators),
        );
        Ok(())
    }
}

fn parse_arguments(style: ArgumentStyle, escape_char: char, input: &mut Input<'_>) -> PResult<Vec<Token>> {
    match style {
        ArgumentStyle::Words { exec_form, variables } => {
            if exec_form {
                let checkpoint = input.checkpoint();
                if let Ok(tokens) =
                    parse::arg_tokens(escape_char, parse::exec_form(escape_char, variables)).parse_next(input)
                {
                    if parse::at_instruction_end(escape_char, input) {
                        return Ok(tokens);
                    }
                }
                input.reset(&checkpoint);
            }
            let grammar = if variables {
                LiteralGrammar::WORD
            } else {
                LiteralGrammar::WORD.without_variables()
            };
            let word = || parse::literal_token(escape_char, grammar);
            let mut tokens = parse::required_arg(escape_char, "argument", word()).parse_next(input)?;
            while let Some(mut next) = opt(parse::arg_tokens(escape_char, word())).parse_next(input)? {
                tokens.append(&mut next);
            }
            Ok(tokens)
        }
        ArgumentStyle::Line { variables } => {
            let grammar = if variables {
                LiteralGrammar::LINE
            } else {
                LiteralGrammar::LINE.without_variables()
            };
            parse::required_arg(escape_char, "argument", parse::literal_token(escape_char, grammar)).parse_next(input)
        }
        ArgumentStyle::ExecForm => {
            parse::required_arg(escape_char, "JSON array", parse::exec_form(escape_char, false)).parse_next(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_with_flags() {
        let text = "COPY --from=build --chown=app:app /src/out /app\n";
        let copy = GenericInstruction::parse(text, '\\').unwrap();
        assert_eq!(copy.to_string(), text);
        assert_eq!(copy.flag("from").unwrap().value().as_deref(), Some("build"));
        assert_eq!(copy.argument_values(), vec!["/src/out", "/app"]);
    }

    #[test]
    fn test_copy_exec_form() {
        let copy = GenericInstruction::parse("COPY [\"my file\", \"/dst/\"]", '\\').unwrap();
        assert_eq!(copy.argument_values(), vec!["my file", "/dst/"]);
    }

    #[test]
    fn test_set_flag() {
        let mut copy = GenericInstruction::parse("COPY --from=build a b", '\\').unwrap();
        copy.set_flag("chmod", Some(Some("755"))).unwrap();
        assert_eq!(copy.to_string(), "COPY --from=build --chmod=755 a b");

        copy.set_flag("from", Some(Some("base"))).unwrap();
        assert_eq!(copy.to_string(), "COPY --from=base --chmod=755 a b");

        copy.set_flag("link", Some(None)).unwrap();
        assert_eq!(copy.to_string(), "COPY --from=base --chmod=755 --link a b");

        copy.set_flag("from", None).unwrap();
        assert_eq!(copy.to_string(), "COPY --chmod=755 --link a b");
    }

    #[test]
    fn test_set_flag_without_existing_flags() {
        let mut add = GenericInstruction::parse("ADD a b", '\\').unwrap();
        add.set_flag("link", Some(None)).unwrap();
        assert_eq!(add.to_string(), "ADD --link a b");
    }

    #[test]
    fn test_healthcheck_line_has_no_variables() {
        let healthcheck = GenericInstruction::parse("HEALTHCHECK --interval=5m CMD curl -f http://$HOST/", '\\').unwrap();
        assert_eq!(healthcheck.flag("interval").unwrap().value().as_deref(), Some("5m"));
        let arguments = healthcheck.arguments();
        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments[0].variable_refs().count(), 0);
    }

    #[test]
    fn test_shell_requires_exec_form() {
        assert!(GenericInstruction::parse("SHELL [\"/bin/sh\", \"-c\"]", '\\').is_ok());
        let err = GenericInstruction::parse("SHELL /bin/sh", '\\').unwrap_err();
        assert_eq!(err.message(), "expected JSON array");
    }

    #[test]
    fn test_expose_requires_argument() {
        let err = GenericInstruction::parse("EXPOSE", '\\').unwrap_err();
        assert_eq!(err.message(), "expected argument");
    }

    #[test]
    fn test_create() {
        let workdir = GenericInstruction::create("workdir", &["/app"], '\\').unwrap();
        assert_eq!(workdir.to_string(), "WORKDIR /app");
        assert!(GenericInstruction::create("RUN", &["x"], '\\').is_err());
        assert!(GenericInstruction::create("USER", &[], '\\').is_err());
    }
}
