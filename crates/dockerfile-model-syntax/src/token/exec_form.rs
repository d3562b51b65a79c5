//! JSON array arguments: `["executable", "param"]`.

use crate::{
    error::{Error, Result},
    parse,
    token::{LiteralToken, Token, aggregate_token},
};

/// An exec-form argument list.
///
/// Children: `[`, then the quoted element literals separated by `,` symbols,
/// then `]`. Whitespace and line continuations may appear between any two
/// of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecFormToken {
    tokens: Vec<Token>,
}

aggregate_token!(ExecFormToken);

impl ExecFormToken {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Build `["a", "b"]`, escaping quotes and backslashes in each value.
    pub fn new<S: AsRef<str>>(values: &[S], escape_char: char, can_contain_variables: bool) -> Result<Self> {
        let elements: Vec<String> = values
            .iter()
            .map(|value| format!("\"{}\"", value.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        let text = format!("[{}]", elements.join(", "));
        parse::parse_complete(&text, parse::exec_form(escape_char, can_contain_variables))
            .map_err(|err| Error::invalid_argument("values", err.message().to_string()))
    }

    /// The element literals.
    pub fn elements(&self) -> impl Iterator<Item = &LiteralToken> {
        self.tokens.iter().filter_map(Token::as_literal)
    }

    /// The element values, with quotes removed and JSON escapes decoded.
    pub fn values(&self) -> Vec<String> {
        self.elements().map(|element| decode(&element.value())).collect()
    }
}

fn decode(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }
    value
}
