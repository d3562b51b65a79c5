//! `RUN`, `CMD` and `ENTRYPOINT`: flags followed by a command in shell or
//! exec form.

use winnow::{Parser, stream::Stream};

use crate::{
    error::{Error, ParseError, Result},
    instruction as common,
    parse::{self, Input, LiteralGrammar, PResult},
    token::{Aggregate, ExecFormToken, KeyValueToken, LiteralToken, Token, aggregate_token},
};

const KEYWORDS: [&str; 3] = ["RUN", "CMD", "ENTRYPOINT"];

/// Parse the command of an instruction: an exec-form array when the whole
/// remainder is one, otherwise the rest of the line as a shell command.
pub(crate) fn parse_command(
    escape_char: char,
    variables: bool,
    input: &mut Input<'_>,
) -> PResult<Vec<Token>> {
    let checkpoint = input.checkpoint();
    if let Ok(tokens) = parse::arg_tokens(escape_char, parse::exec_form(escape_char, variables)).parse_next(input) {
        if parse::at_instruction_end(escape_char, input) {
            return Ok(tokens);
        }
    }
    input.reset(&checkpoint);

    let grammar = if variables {
        LiteralGrammar::LINE
    } else {
        LiteralGrammar::LINE.without_variables()
    };
    parse::required_arg(escape_char, "command", parse::literal_token(escape_char, grammar)).parse_next(input)
}

/// Runs a command at build time (`RUN`) or sets the container's command
/// (`CMD`, `ENTRYPOINT`).
///
/// The command text is not subject to build-time variable substitution; the
/// shell expands it when the container runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInstruction {
    tokens: Vec<Token>,
    escape_char: char,
}

aggregate_token!(CommandInstruction);

impl CommandInstruction {
    /// Parse a `RUN`, `CMD` or `ENTRYPOINT` instruction.
    pub fn parse(text: &str, escape_char: char) -> std::result::Result<Self, ParseError> {
        parse::parse_complete(text, Self::parser(escape_char))
    }

    /// A parser accepting any of the three keywords.
    pub fn parser<'a>(escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            for keyword in KEYWORDS {
                let checkpoint = input.checkpoint();
                match Self::keyword_parser(keyword, escape_char).parse_next(input) {
                    Err(winnow::error::ErrMode::Backtrack(_)) => input.reset(&checkpoint),
                    other => return other,
                }
            }
            parse::backtrack()
        }
    }

    pub(crate) fn keyword_parser<'a>(keyword: &'static str, escape_char: char) -> impl FnMut(&mut Input<'a>) -> PResult<Self> {
        move |input: &mut Input<'a>| {
            let mut tokens = parse::instruction_start(keyword).parse_next(input)?;
            tokens.append(&mut common::parse_flags(escape_char, input)?);
            tokens.append(&mut parse_command(escape_char, false, input)?);
            tokens.append(&mut parse::instruction_end(escape_char).parse_next(input)?);
            Ok(Self { tokens, escape_char })
        }
    }

    fn check_keyword(keyword: &str) -> Result<&'static str> {
        KEYWORDS
            .into_iter()
            .find(|known| known.eq_ignore_ascii_case(keyword))
            .ok_or_else(|| Error::invalid_argument("keyword", format!("`{keyword}` is not RUN, CMD or ENTRYPOINT")))
    }

    /// Build `<keyword> <command>` in shell form.
    pub fn create_shell(keyword: &str, command: &str, escape_char: char) -> Result<Self> {
        let keyword = Self::check_keyword(keyword)?;
        if command.trim().is_empty() {
            return Err(Error::invalid_argument("command", "value must not be empty"));
        }
        Ok(Self::parse(&format!("{keyword} {command}"), escape_char)?)
    }

    /// Build `<keyword> ["arg", ...]` in exec form.
    pub fn create_exec<S: AsRef<str>>(keyword: &str, args: &[S], escape_char: char) -> Result<Self> {
        let keyword = Self::check_keyword(keyword)?;
        let exec_form = ExecFormToken::new(args, escape_char, false)?;
        Ok(Self::parse(&format!("{keyword} {exec_form}"), escape_char)?)
    }

    pub fn escape_char(&self) -> char {
        self.escape_char
    }

    /// The flags, such as `--mount=...` on `RUN`.
    pub fn flags(&self) -> impl Iterator<Item = &KeyValueToken> {
        common::flags(&self.tokens)
    }

    /// The exec-form arguments, if the command uses that form.
    pub fn exec_form(&self) -> Option<&ExecFormToken> {
        self.tokens.iter().find_map(Token::as_exec_form)
    }

    /// The shell-form command literal, if the command uses that form.
    pub fn shell_command(&self) -> Option<&LiteralToken> {
        self.tokens.iter().find_map(Token::as_literal)
    }

    /// The command as a single string: the shell text, or the exec-form
    /// values joined by spaces.
    pub fn command(&self) -> String {
        match (self.exec_form(), self.shell_command()) {
            (Some(exec_form), _) => exec_form.values().join(" "),
            (None, Some(shell)) => shell.value(),
            (None, None) => String::new(),
        }
    }

    /// Replace the command with a shell-form command, keeping flags.
    pub fn set_shell_command(&mut self, command: &str) -> Result<()> {
        let literal = LiteralToken::create(
            "command",
            command,
            self.escape_char,
            LiteralGrammar::LINE.without_variables(),
        )?;
        self.replace_command(Token::Literal(literal));
        Ok(())
    }

    /// Replace the command with an exec-form command, keeping flags.
    pub fn set_exec_form<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        let exec_form = ExecFormToken::new(args, self.escape_char, false)?;
        self.replace_command(Token::ExecForm(exec_form));
        Ok(())
    }

    fn replace_command(&mut self, command: Token) {
        let current = self.position(|token| matches!(token, Token::Literal(_) | Token::ExecForm(_)));
        self.set_token(current, Some(command), Some(&common::append_argument), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Commentable;

    #[test]
    fn test_shell_form() {
        let text = "RUN apt-get update && \\\n    # refresh\n    apt-get install -y curl\n";
        let run = CommandInstruction::parse(text, '\\').unwrap();
        assert_eq!(run.to_string(), text);
        assert!(run.exec_form().is_none());
        assert_eq!(run.command(), "apt-get update &&     apt-get install -y curl");
        assert_eq!(run.comments(), vec!["refresh".to_string()]);
    }

    #[test]
    fn test_exec_form() {
        let text = "ENTRYPOINT [ \"/bin/app\", \"--port\", \"80\" ]\n";
        let entrypoint = CommandInstruction::parse(text, '\\').unwrap();
        assert_eq!(entrypoint.to_string(), text);
        assert_eq!(
            entrypoint.exec_form().unwrap().values(),
            vec!["/bin/app".to_string(), "--port".to_string(), "80".to_string()]
        );
    }

    #[test]
    fn test_bracket_shell_command_falls_back() {
        let text = "RUN [ -f /etc/os-release ] && cat /etc/os-release";
        let run = CommandInstruction::parse(text, '\\').unwrap();
        assert!(run.exec_form().is_none());
        assert_eq!(run.command(), "[ -f /etc/os-release ] && cat /etc/os-release");
    }

    #[test]
    fn test_flags() {
        let run = CommandInstruction::parse("RUN --mount=type=cache,target=/root/.cache --network=none make", '\\').unwrap();
        let flags: Vec<_> = run.flags().map(|flag| flag.key().to_string()).collect();
        assert_eq!(flags, vec!["mount", "network"]);
        assert_eq!(run.command(), "make");
    }

    #[test]
    fn test_variables_are_not_parsed() {
        let run = CommandInstruction::parse("RUN echo $HOME", '\\').unwrap();
        assert_eq!(run.shell_command().unwrap().variable_refs().count(), 0);
    }

    #[test]
    fn test_create_and_replace() {
        let mut cmd = CommandInstruction::create_exec("cmd", &["nginx", "-g", "daemon off;"], '\\').unwrap();
        assert_eq!(cmd.to_string(), "CMD [\"nginx\", \"-g\", \"daemon off;\"]");

        cmd.set_shell_command("nginx -g 'daemon off;'").unwrap();
        assert_eq!(cmd.to_string(), "CMD nginx -g 'daemon off;'");

        assert!(CommandInstruction::create_shell("COPY", "a", '\\').is_err());
        assert!(CommandInstruction::create_shell("RUN", "  ", '\\').is_err());
    }
}
