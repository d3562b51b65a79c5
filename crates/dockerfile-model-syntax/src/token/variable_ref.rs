//! Variable references: `$NAME`, `${NAME}` and `${NAME<op>word}`.

use std::{fmt, str::FromStr};

use crate::{
    error::{Error, ParseError},
    parse,
    token::{LeafKind, LiteralToken, Token, aggregate_token},
};

/// The operator of a `${NAME<op>word}` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `-`: `word` when the variable is unset.
    DefaultIfUnset,
    /// `:-`: `word` when the variable is unset or empty.
    DefaultIfUnsetOrEmpty,
    /// `+`: `word` when the variable is set, otherwise empty.
    AlternateIfSet,
    /// `:+`: `word` when the variable is set and non-empty, otherwise empty.
    AlternateIfSetAndNonEmpty,
    /// `?`: fail with `word` as the message when the variable is unset.
    ErrorIfUnset,
    /// `:?`: fail with `word` as the message when the variable is unset or
    /// empty.
    ErrorIfUnsetOrEmpty,
}

impl Modifier {
    /// The operator as written in a Dockerfile.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::DefaultIfUnset => "-",
            Modifier::DefaultIfUnsetOrEmpty => ":-",
            Modifier::AlternateIfSet => "+",
            Modifier::AlternateIfSetAndNonEmpty => ":+",
            Modifier::ErrorIfUnset => "?",
            Modifier::ErrorIfUnsetOrEmpty => ":?",
        }
    }

    /// Whether an empty value counts as unset (the `:` forms).
    pub fn treats_empty_as_unset(&self) -> bool {
        self.as_str().starts_with(':')
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => Ok(Modifier::DefaultIfUnset),
            ":-" => Ok(Modifier::DefaultIfUnsetOrEmpty),
            "+" => Ok(Modifier::AlternateIfSet),
            ":+" => Ok(Modifier::AlternateIfSetAndNonEmpty),
            "?" => Ok(Modifier::ErrorIfUnset),
            ":?" => Ok(Modifier::ErrorIfUnsetOrEmpty),
            _ => Err(Error::invalid_argument("modifier", format!("unknown operator `{s}`"))),
        }
    }
}

/// A reference to a variable inside a literal.
///
/// Children, in order: the `$` marker, `{` when braced, the name, the
/// operator and the word literal when a modifier is present, `}` when
/// braced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRefToken {
    tokens: Vec<Token>,
}

aggregate_token!(VariableRefToken);

impl VariableRefToken {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parse a single variable reference.
    pub fn parse(text: &str, escape_char: char) -> Result<Self, ParseError> {
        parse::parse_complete(text, parse::variable_ref(escape_char))
    }

    /// Build `${name}`, or `${name<op>word}` when a modifier is given.
    pub fn create(name: &str, modifier: Option<(Modifier, &str)>, escape_char: char) -> crate::Result<Self> {
        if name.is_empty() || !name.chars().all(parse::is_name_char) {
            return Err(Error::invalid_argument("name", format!("`{name}` is not a variable name")));
        }
        let text = match modifier {
            Some((modifier, word)) => format!("${{{name}{modifier}{word}}}"),
            None => format!("${{{name}}}"),
        };
        Self::parse(&text, escape_char).map_err(|err| Error::invalid_argument("word", err.message().to_string()))
    }

    /// The variable name.
    pub fn name(&self) -> &str {
        self.tokens
            .iter()
            .filter_map(Token::as_leaf)
            .find(|leaf| leaf.kind() == LeafKind::Identifier)
            .map(|leaf| leaf.text())
            .unwrap_or_default()
    }

    /// Whether the reference uses the `${...}` form.
    pub fn is_braced(&self) -> bool {
        self.tokens.iter().any(|token| token.is_leaf(LeafKind::Symbol, "{"))
    }

    /// The modifier operator, if any.
    pub fn modifier(&self) -> Option<Modifier> {
        self.tokens
            .iter()
            .filter_map(Token::as_leaf)
            .find(|leaf| leaf.kind() == LeafKind::Operator)
            .and_then(|leaf| leaf.text().parse().ok())
    }

    /// The word following the modifier operator.
    pub fn modifier_value_token(&self) -> Option<&LiteralToken> {
        self.tokens.iter().find_map(Token::as_literal)
    }

    /// The source text of the modifier word.
    pub fn modifier_value(&self) -> Option<String> {
        self.modifier_value_token().map(LiteralToken::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_round_trip_through_text() {
        for op in ["-", ":-", "+", ":+", "?", ":?"] {
            let modifier: Modifier = op.parse().unwrap();
            assert_eq!(modifier.as_str(), op);
            assert_eq!(modifier.treats_empty_as_unset(), op.starts_with(':'));
        }
        assert!("!".parse::<Modifier>().is_err());
    }

    #[test]
    fn test_accessors() {
        let variable = VariableRefToken::parse("${TAG:?tag is required}", '\\').unwrap();
        assert_eq!(variable.name(), "TAG");
        assert!(variable.is_braced());
        assert_eq!(variable.modifier(), Some(Modifier::ErrorIfUnsetOrEmpty));
        assert_eq!(variable.modifier_value().as_deref(), Some("tag is required"));
    }

    #[test]
    fn test_empty_modifier_word() {
        let variable = VariableRefToken::parse("${TAG:-}", '\\').unwrap();
        assert_eq!(variable.modifier_value().as_deref(), Some(""));
        assert_eq!(variable.to_string(), "${TAG:-}");
    }

    #[test]
    fn test_create() {
        let plain = VariableRefToken::create("A", None, '\\').unwrap();
        assert_eq!(plain.to_string(), "${A}");

        let with_default = VariableRefToken::create("A", Some((Modifier::DefaultIfUnset, "x")), '\\').unwrap();
        assert_eq!(with_default.to_string(), "${A-x}");

        assert!(VariableRefToken::create("", None, '\\').is_err());
        assert!(VariableRefToken::create("A", Some((Modifier::AlternateIfSet, "}")), '\\').is_err());
    }
}
