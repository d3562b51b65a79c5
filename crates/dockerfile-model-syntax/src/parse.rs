//! Parser combinators shared by every Dockerfile grammar.
//!
//! All parsers run over a [`LocatingSlice`] so that failures can report the
//! byte offset of the first character that did not match. Recoverable
//! failures backtrack; once a grammar has committed to a construct (for
//! example after reading its keyword) failures are cut and carry a
//! [`Context`] naming what was expected and where.
//!
//! Whitespace handling is explicit: line continuations and the comment lines
//! that follow them are first-class tokens, and every argument of an
//! instruction is preceded by the separator tokens that were actually read.

use log::trace;
use winnow::{
    Parser,
    ascii::Caseless,
    combinator::{alt, opt},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{any, literal, one_of, take_till, take_while},
};

use crate::{
    error::{ErrorCode, ParseError},
    token::{
        CommentToken, ExecFormToken, KeyValueToken, LeafKind, LineContinuationToken, LiteralToken, Token,
        VariableRefToken,
    },
};

/// The input stream type used by all grammars.
pub type Input<'a> = LocatingSlice<&'a str>;

/// The result type used by all grammars.
pub type PResult<O> = ModalResult<O, ContextError<Context>>;

/// Diagnostic context attached to committed parse failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// A required construct was missing at `offset`.
    Expected { label: &'static str, offset: usize },
    /// A construct started at `offset` but was malformed.
    Failure {
        code: ErrorCode,
        message: &'static str,
        offset: usize,
    },
}

/// Characters allowed in variable and argument names.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Spaces and tabs.
pub(crate) fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// A recoverable failure without context.
pub(crate) fn backtrack<O>() -> PResult<O> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// A committed failure reporting that `label` was expected at `offset`.
pub(crate) fn expected_at(input: &Input<'_>, offset: usize, label: &'static str) -> ErrMode<ContextError<Context>> {
    ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        Context::Expected { label, offset },
    ))
}

/// A committed failure for a malformed construct starting at `offset`.
pub(crate) fn failure_at(
    input: &Input<'_>,
    offset: usize,
    code: ErrorCode,
    message: &'static str,
) -> ErrMode<ContextError<Context>> {
    ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        Context::Failure {
            code,
            message,
            offset,
        },
    ))
}

/// Commit to `parser`: a backtrack becomes a cut error reporting `label` at
/// the position where `parser` started.
pub(crate) fn expect<'a, O, P>(label: &'static str, mut parser: P) -> impl FnMut(&mut Input<'a>) -> PResult<O>
where
    P: Parser<Input<'a>, O, ErrMode<ContextError<Context>>>,
{
    move |input: &mut Input<'a>| {
        let offset = input.current_token_start();
        match parser.parse_next(input) {
            Err(ErrMode::Backtrack(_)) => Err(expected_at(input, offset, label)),
            other => other,
        }
    }
}

/// Run `parser` over all of `source`.
///
/// Text left over after a successful parse is reported as trailing input.
pub(crate) fn parse_complete<'a, O, P>(source: &'a str, mut parser: P) -> Result<O, ParseError>
where
    P: Parser<Input<'a>, O, ErrMode<ContextError<Context>>>,
{
    let mut input = Input::new(source);
    match parser.parse_next(&mut input) {
        Ok(output) if input.is_empty() => Ok(output),
        Ok(_) => Err(ParseError::at(
            source,
            input.current_token_start(),
            ErrorCode::E101,
            "unexpected text after the end of the construct",
        )),
        Err(err) => Err(convert_error(source, err, input.current_token_start())),
    }
}

fn convert_error(source: &str, err: ErrMode<ContextError<Context>>, current: usize) -> ParseError {
    let context = match &err {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e.context().next().cloned(),
        ErrMode::Incomplete(_) => None,
    };

    let err = match context {
        Some(Context::Failure {
            code,
            message,
            offset,
        }) => ParseError::at(source, offset, code, message),
        Some(Context::Expected { label, offset }) => {
            ParseError::at(source, offset, ErrorCode::E100, format!("expected {label}"))
        }
        None => ParseError::at(source, current, ErrorCode::E100, "unexpected input"),
    };
    trace!(code:% = err.code(), offset = err.offset(); "Parse failed");
    err
}

/// A run of spaces and tabs.
pub(crate) fn whitespace(input: &mut Input<'_>) -> PResult<Token> {
    take_while(1.., is_blank)
        .map(Token::whitespace)
        .parse_next(input)
}

/// `\n` or `\r\n`.
pub(crate) fn newline(input: &mut Input<'_>) -> PResult<Token> {
    alt(("\r\n", "\n")).map(Token::newline).parse_next(input)
}

/// Returns `true` if the input is at a newline or at the end.
pub(crate) fn at_line_end(input: &Input<'_>) -> bool {
    input.is_empty() || input.starts_with('\n') || input.starts_with("\r\n")
}

/// The escape char, optional trailing whitespace, and a newline.
pub(crate) fn line_continuation<'a>(escape: char) -> impl FnMut(&mut Input<'a>) -> PResult<LineContinuationToken> {
    move |input: &mut Input<'a>| {
        let mut tokens = vec![Token::symbol(one_of(escape).parse_next(input)?.to_string())];
        if let Some(ws) = opt(whitespace).parse_next(input)? {
            tokens.push(ws);
        }
        tokens.push(newline(input)?);
        Ok(LineContinuationToken::from_tokens(tokens))
    }
}

/// A full comment line: optional indentation, `#`, the text, and the
/// newline if one follows.
pub(crate) fn comment_line(input: &mut Input<'_>) -> PResult<CommentToken> {
    let mut tokens = Vec::new();
    if let Some(ws) = opt(whitespace).parse_next(input)? {
        tokens.push(ws);
    }
    '#'.parse_next(input)?;
    tokens.push(Token::leaf(LeafKind::CommentMarker, "#"));

    let text: &str = take_till(0.., ['\r', '\n']).parse_next(input)?;
    if !text.is_empty() {
        tokens.push(Token::fragment(text));
    }
    if let Some(nl) = opt(newline).parse_next(input)? {
        tokens.push(nl);
    }
    Ok(CommentToken::from_tokens(tokens))
}

/// A line continuation followed by any comment lines and empty lines it
/// carries into the continued instruction.
pub(crate) fn continuation<'a>(escape: char) -> impl FnMut(&mut Input<'a>) -> PResult<Vec<Token>> {
    move |input: &mut Input<'a>| {
        let mut tokens = vec![Token::LineContinuation(line_continuation(escape).parse_next(input)?)];
        loop {
            if let Some(comment) = opt(comment_line).parse_next(input)? {
                tokens.push(Token::Comment(comment));
                continue;
            }
            if let Some(mut blank) = opt(blank_line).parse_next(input)? {
                tokens.append(&mut blank);
                continue;
            }
            break;
        }
        Ok(tokens)
    }
}

/// Optional whitespace followed by a newline.
pub(crate) fn blank_line(input: &mut Input<'_>) -> PResult<Vec<Token>> {
    let mut tokens = Vec::new();
    if let Some(ws) = opt(whitespace).parse_next(input)? {
        tokens.push(ws);
    }
    tokens.push(newline(input)?);
    Ok(tokens)
}

/// One or more whitespace runs and continuations.
pub(crate) fn separator<'a>(escape: char) -> impl FnMut(&mut Input<'a>) -> PResult<Vec<Token>> {
    move |input: &mut Input<'a>| {
        let mut tokens = Vec::new();
        loop {
            if let Some(ws) = opt(whitespace).parse_next(input)? {
                tokens.push(ws);
                continue;
            }
            if let Some(mut lc) = opt(continuation(escape)).parse_next(input)? {
                tokens.append(&mut lc);
                continue;
            }
            break;
        }
        if tokens.is_empty() {
            return backtrack();
        }
        Ok(tokens)
    }
}

/// A separator followed by `parser`. Backtracks as a whole when either
/// part is missing.
pub(crate) fn arg_tokens<'a, O, P>(escape: char, mut parser: P) -> impl FnMut(&mut Input<'a>) -> PResult<Vec<Token>>
where
    O: Into<Token>,
    P: Parser<Input<'a>, O, ErrMode<ContextError<Context>>>,
{
    move |input: &mut Input<'a>| {
        let checkpoint = input.checkpoint();
        let mut tokens = separator(escape).parse_next(input)?;
        match parser.parse_next(input) {
            Ok(output) => {
                tokens.push(output.into());
                Ok(tokens)
            }
            Err(ErrMode::Backtrack(e)) => {
                input.reset(&checkpoint);
                Err(ErrMode::Backtrack(e))
            }
            Err(e) => Err(e),
        }
    }
}

/// A separator followed by `parser`, committing to both.
pub(crate) fn required_arg<'a, O, P>(
    escape: char,
    label: &'static str,
    parser: P,
) -> impl FnMut(&mut Input<'a>) -> PResult<Vec<Token>>
where
    O: Into<Token>,
    P: Parser<Input<'a>, O, ErrMode<ContextError<Context>>>,
{
    let mut parser = expect(label, parser);
    move |input: &mut Input<'a>| {
        let offset = input.current_token_start();
        let Some(mut tokens) = opt(separator(escape)).parse_next(input)? else {
            return Err(expected_at(input, offset, label));
        };
        tokens.push(parser(input)?.into());
        Ok(tokens)
    }
}

/// Trailing separators and the newline that end an instruction.
///
/// The end of input also ends an instruction. Any other text is a
/// committed failure located at the first unexpected character.
pub(crate) fn instruction_end<'a>(escape: char) -> impl FnMut(&mut Input<'a>) -> PResult<Vec<Token>> {
    move |input: &mut Input<'a>| {
        let mut tokens = opt(separator(escape)).parse_next(input)?.unwrap_or_default();
        if input.is_empty() {
            return Ok(tokens);
        }
        match opt(newline).parse_next(input)? {
            Some(nl) => {
                tokens.push(nl);
                Ok(tokens)
            }
            None => Err(expected_at(input, input.current_token_start(), "end of line")),
        }
    }
}

/// Returns `true` if only separators remain before the end of the line.
pub(crate) fn at_instruction_end(escape: char, input: &mut Input<'_>) -> bool {
    let checkpoint = input.checkpoint();
    let _ = opt(separator(escape)).parse_next(input);
    let result = at_line_end(input);
    input.reset(&checkpoint);
    result
}

/// A keyword, matched case-insensitively and not followed by a word
/// character. The original spelling is kept.
pub(crate) fn keyword<'a>(name: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<Token> {
    move |input: &mut Input<'a>| {
        let checkpoint = input.checkpoint();
        let text: &str = literal(Caseless(name)).parse_next(input)?;
        if input.chars().next().is_some_and(is_name_char) {
            input.reset(&checkpoint);
            return backtrack();
        }
        Ok(Token::keyword(text))
    }
}

/// Optional indentation followed by the instruction keyword.
pub(crate) fn instruction_start<'a>(name: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<Vec<Token>> {
    move |input: &mut Input<'a>| {
        let mut tokens = Vec::new();
        if let Some(ws) = opt(whitespace).parse_next(input)? {
            tokens.push(ws);
        }
        tokens.push(keyword(name).parse_next(input)?);
        Ok(tokens)
    }
}

/// A name made of characters accepted by `predicate`.
pub(crate) fn identifier<'a>(predicate: fn(char) -> bool) -> impl FnMut(&mut Input<'a>) -> PResult<Token> {
    move |input: &mut Input<'a>| {
        take_while(1.., predicate)
            .map(Token::identifier)
            .parse_next(input)
    }
}

/// How a literal ends and what it may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LiteralGrammar {
    /// `$` starts a variable reference.
    pub variables: bool,
    /// Whitespace ends the literal.
    pub whitespace_terminates: bool,
    /// `"` and `'` open quoted runs that keep whitespace.
    pub quotes: bool,
    /// Unquoted characters that end the literal.
    pub terminators: &'static [char],
    /// The literal may consist of nothing at all.
    pub allow_empty: bool,
    /// Trailing whitespace before the end of the line is left out.
    pub trim_trailing_whitespace: bool,
    /// A backslash escapes the next character even when it is not the
    /// escape char.
    pub json_escapes: bool,
    /// The closing quote of the first quoted run ends the literal.
    pub single_quoted_run: bool,
}

impl LiteralGrammar {
    /// A single whitespace-delimited word, possibly with quoted runs.
    pub const WORD: Self = Self {
        variables: true,
        whitespace_terminates: true,
        quotes: true,
        terminators: &[],
        allow_empty: false,
        trim_trailing_whitespace: false,
        json_escapes: false,
        single_quoted_run: false,
    };

    /// The value after `key=`; may be empty.
    pub const VALUE: Self = Self {
        allow_empty: true,
        ..Self::WORD
    };

    /// The rest of the line, without trailing whitespace.
    pub const LINE: Self = Self {
        variables: true,
        whitespace_terminates: false,
        quotes: false,
        terminators: &[],
        allow_empty: false,
        trim_trailing_whitespace: true,
        json_escapes: false,
        single_quoted_run: false,
    };

    /// The word of a `${NAME<op>word}` reference.
    pub const MODIFIER_WORD: Self = Self {
        variables: true,
        whitespace_terminates: false,
        quotes: false,
        terminators: &['}'],
        allow_empty: true,
        trim_trailing_whitespace: false,
        json_escapes: false,
        single_quoted_run: false,
    };

    /// Free text, as handed to the standalone resolver.
    pub const TEXT: Self = Self {
        variables: true,
        whitespace_terminates: false,
        quotes: false,
        terminators: &[],
        allow_empty: true,
        trim_trailing_whitespace: false,
        json_escapes: false,
        single_quoted_run: false,
    };

    /// A double-quoted element of an exec-form array.
    pub const EXEC_ELEMENT: Self = Self {
        json_escapes: true,
        single_quoted_run: true,
        ..Self::WORD
    };

    /// Copy of this grammar with variable references disabled.
    pub const fn without_variables(self) -> Self {
        Self {
            variables: false,
            ..self
        }
    }
}

#[derive(Default)]
struct LiteralBuilder {
    tokens: Vec<Token>,
    text: String,
}

impl LiteralBuilder {
    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.tokens.push(Token::fragment(std::mem::take(&mut self.text)));
        }
    }

    fn push(&mut self, token: Token) {
        self.flush();
        self.tokens.push(token);
    }
}

/// A literal read according to `grammar`.
pub(crate) fn literal_token<'a>(escape: char, grammar: LiteralGrammar) -> impl FnMut(&mut Input<'a>) -> PResult<LiteralToken> {
    move |input: &mut Input<'a>| scan_literal(input, escape, grammar)
}

fn scan_literal(input: &mut Input<'_>, escape: char, grammar: LiteralGrammar) -> PResult<LiteralToken> {
    let mut builder = LiteralBuilder::default();

    // The open quote and the offset it was found at. Quoted runs may start
    // and end anywhere in the literal.
    let mut quote: Option<(char, usize)> = None;
    // Start of a whitespace run that may turn out to be trailing.
    let mut trailing = None;

    while let Some(c) = input.chars().next() {
        if c == escape {
            if let Some(mut tokens) = opt(continuation(escape)).parse_next(input)? {
                trailing = None;
                builder.flush();
                builder.tokens.append(&mut tokens);
                continue;
            }
            input.next_token();
            builder.text.push(c);
            if !at_line_end(input) {
                let escaped = any.parse_next(input)?;
                builder.text.push(escaped);
            }
            trailing = None;
            continue;
        }

        if c == '\n' || input.starts_with("\r\n") {
            break;
        }

        if c == '\\' && grammar.json_escapes {
            input.next_token();
            builder.text.push(c);
            if !at_line_end(input) {
                let escaped = any.parse_next(input)?;
                builder.text.push(escaped);
            }
            trailing = None;
            continue;
        }

        match quote {
            Some((q, _)) if c == q => {
                input.next_token();
                builder.push(Token::symbol(q.to_string()));
                quote = None;
                trailing = None;
                if grammar.single_quoted_run {
                    break;
                }
                continue;
            }
            Some(_) => {}
            None if grammar.quotes && matches!(c, '"' | '\'') => {
                let offset = input.current_token_start();
                input.next_token();
                builder.push(Token::symbol(c.to_string()));
                quote = Some((c, offset));
                trailing = None;
                continue;
            }
            None => {
                if grammar.terminators.contains(&c) {
                    break;
                }
                if is_blank(c) {
                    if grammar.whitespace_terminates {
                        break;
                    }
                    if grammar.trim_trailing_whitespace && trailing.is_none() {
                        trailing = Some((input.checkpoint(), builder.text.len()));
                    }
                    input.next_token();
                    builder.text.push(c);
                    continue;
                }
            }
        }

        if c == '$' && grammar.variables && !matches!(quote, Some(('\'', _))) {
            if let Some(variable) = opt(variable_ref(escape)).parse_next(input)? {
                trailing = None;
                builder.push(Token::VariableRef(variable));
                continue;
            }
        }

        input.next_token();
        builder.text.push(c);
        trailing = None;
    }

    if let Some((_, offset)) = quote {
        return Err(failure_at(input, offset, ErrorCode::E103, "unterminated quoted string"));
    }
    if let Some((checkpoint, len)) = trailing {
        input.reset(&checkpoint);
        builder.text.truncate(len);
    }
    builder.flush();

    if builder.tokens.is_empty() && !grammar.allow_empty {
        return backtrack();
    }
    Ok(LiteralToken::from_tokens(builder.tokens, grammar.variables))
}

/// `$NAME`, `${NAME}` or `${NAME<op>word}`.
///
/// A `$` that is not followed by a name backtracks so that the caller can
/// keep it as plain text. A `${` that is not well formed is a committed
/// failure.
pub(crate) fn variable_ref<'a>(escape: char) -> impl FnMut(&mut Input<'a>) -> PResult<VariableRefToken> {
    move |input: &mut Input<'a>| {
        let start = input.current_token_start();
        '$'.parse_next(input)?;
        let mut tokens = vec![Token::leaf(LeafKind::VariableRefMarker, "$")];

        if opt('{').parse_next(input)?.is_none() {
            let name: &str = take_while(1.., is_name_char)
                .verify(|name: &str| !name.starts_with(|c: char| c.is_ascii_digit()))
                .parse_next(input)?;
            tokens.push(Token::identifier(name));
            return Ok(VariableRefToken::from_tokens(tokens));
        }
        tokens.push(Token::symbol("{"));

        let name: &str = take_while(0.., is_name_char).parse_next(input)?;
        if name.is_empty() {
            return Err(bad_substitution(input, start));
        }
        tokens.push(Token::identifier(name));

        if opt('}').parse_next(input)?.is_some() {
            tokens.push(Token::symbol("}"));
            return Ok(VariableRefToken::from_tokens(tokens));
        }

        let Some(operator) = opt(alt((":-", ":+", ":?", "-", "+", "?"))).parse_next(input)? else {
            if at_line_end(input) {
                return Err(missing_brace(input, start));
            }
            return Err(bad_substitution(input, start));
        };
        tokens.push(Token::operator(operator));
        tokens.push(Token::Literal(scan_literal(input, escape, LiteralGrammar::MODIFIER_WORD)?));

        if opt('}').parse_next(input)?.is_none() {
            return Err(missing_brace(input, start));
        }
        tokens.push(Token::symbol("}"));
        Ok(VariableRefToken::from_tokens(tokens))
    }
}

/// `--name` or `--name=value`.
pub(crate) fn flag<'a>(escape: char) -> impl FnMut(&mut Input<'a>) -> PResult<KeyValueToken> {
    move |input: &mut Input<'a>| {
        "--".parse_next(input)?;
        let name: &str = take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)?;
        let mut tokens = vec![Token::symbol("--"), Token::identifier(name)];
        if opt('=').parse_next(input)?.is_some() {
            tokens.push(Token::symbol("="));
            tokens.push(Token::Literal(scan_literal(input, escape, LiteralGrammar::VALUE)?));
        }
        Ok(KeyValueToken::from_tokens(tokens))
    }
}

/// `key=value`, or a bare `key` unless `require_value` is set.
pub(crate) fn key_value<'a>(
    escape: char,
    is_key: fn(char) -> bool,
    require_value: bool,
) -> impl FnMut(&mut Input<'a>) -> PResult<KeyValueToken> {
    move |input: &mut Input<'a>| {
        let key: &str = take_while(1.., is_key).parse_next(input)?;
        let mut tokens = vec![Token::identifier(key)];
        if opt('=').parse_next(input)?.is_some() {
            tokens.push(Token::symbol("="));
            tokens.push(Token::Literal(scan_literal(input, escape, LiteralGrammar::VALUE)?));
        } else if require_value {
            return backtrack();
        }
        Ok(KeyValueToken::from_tokens(tokens))
    }
}

/// A JSON array of double-quoted strings.
///
/// Anything that is not a well-formed array backtracks, so that callers can
/// fall back to the shell form.
pub(crate) fn exec_form<'a>(escape: char, variables: bool) -> impl FnMut(&mut Input<'a>) -> PResult<ExecFormToken> {
    move |input: &mut Input<'a>| {
        let checkpoint = input.checkpoint();
        match scan_exec_form(input, escape, variables) {
            Ok(exec_form) => Ok(exec_form),
            Err(ErrMode::Incomplete(needed)) => Err(ErrMode::Incomplete(needed)),
            Err(_) => {
                input.reset(&checkpoint);
                backtrack()
            }
        }
    }
}

fn scan_exec_form(input: &mut Input<'_>, escape: char, variables: bool) -> PResult<ExecFormToken> {
    let grammar = if variables {
        LiteralGrammar::EXEC_ELEMENT
    } else {
        LiteralGrammar::EXEC_ELEMENT.without_variables()
    };

    '['.parse_next(input)?;
    let mut tokens = vec![Token::symbol("[")];
    tokens.extend(opt(separator(escape)).parse_next(input)?.unwrap_or_default());

    if opt(']').parse_next(input)?.is_some() {
        tokens.push(Token::symbol("]"));
        return Ok(ExecFormToken::from_tokens(tokens));
    }

    loop {
        if !input.starts_with('"') {
            return backtrack();
        }
        tokens.push(Token::Literal(scan_literal(input, escape, grammar)?));
        tokens.extend(opt(separator(escape)).parse_next(input)?.unwrap_or_default());

        if opt(',').parse_next(input)?.is_some() {
            tokens.push(Token::symbol(","));
            tokens.extend(opt(separator(escape)).parse_next(input)?.unwrap_or_default());
            continue;
        }
        ']'.parse_next(input)?;
        tokens.push(Token::symbol("]"));
        return Ok(ExecFormToken::from_tokens(tokens));
    }
}

fn bad_substitution(input: &Input<'_>, offset: usize) -> ErrMode<ContextError<Context>> {
    failure_at(input, offset, ErrorCode::E104, "Bad substitution")
}

fn missing_brace(input: &Input<'_>, offset: usize) -> ErrMode<ContextError<Context>> {
    failure_at(input, offset, ErrorCode::E105, "Missing '}'")
}
