//! Variable resolution.
//!
//! Resolution walks a token tree and replaces every [`VariableRefToken`] with
//! a string fragment holding its expanded value. The modifier word of a
//! `${NAME<op>word}` reference is itself a literal, so expansion recurses
//! into it first.
//!
//! Two lookup policies exist for names that are not in the variable map at
//! all, see [`UndeclaredVariables`]. A name mapped to `None` is declared but
//! unset and always behaves like an unset shell variable.
//!
//! Resolution is all-or-nothing: the tree is rewritten on a working copy,
//! which only replaces the original when
//! [`update_inline`](ResolutionOptions::update_inline) is set and every
//! reference expanded.

use indexmap::IndexMap;
use log::trace;

use crate::{
    error::{Error, Result},
    instruction::Instruction,
    parse,
    token::{Aggregate, LeafKind, LiteralToken, Modifier, Token, VariableRefToken},
};

/// Variable values by name, in declaration order. `None` marks a variable
/// that is declared but has no value.
pub type VariableMap = IndexMap<String, Option<String>>;

/// What a reference to a name missing from the [`VariableMap`] turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UndeclaredVariables {
    /// Treat the name as unset.
    #[default]
    Empty,
    /// Keep the reference text unchanged.
    PassThrough,
}

/// Options for `resolve_variables`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionOptions {
    /// Replace the references in the tree with their values.
    pub update_inline: bool,
    /// Drop escape chars from the literal text, so `\$` becomes `$`.
    pub remove_escape_characters: bool,
}

/// Rewrites variable references in token lists.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolver<'v> {
    escape_char: char,
    variables: &'v VariableMap,
    undeclared: UndeclaredVariables,
    remove_escape_characters: bool,
}

impl<'v> Resolver<'v> {
    pub(crate) fn new(escape_char: char, variables: &'v VariableMap, undeclared: UndeclaredVariables) -> Self {
        Self {
            escape_char,
            variables,
            undeclared,
            remove_escape_characters: false,
        }
    }

    pub(crate) fn removing_escape_characters(self, remove: bool) -> Self {
        Self {
            remove_escape_characters: remove,
            ..self
        }
    }

    /// Replace every reference in `tokens` and their descendants.
    ///
    /// Nested instructions (`ONBUILD` triggers) are left untouched.
    pub(crate) fn rewrite_tokens(&self, tokens: &mut [Token]) -> Result<()> {
        for token in tokens.iter_mut() {
            match token {
                Token::VariableRef(variable) => {
                    let value = self.expand(variable)?;
                    *token = Token::fragment(value);
                }
                Token::Literal(literal) => self.rewrite_literal(literal)?,
                Token::KeyValue(key_value) => self.rewrite_tokens(key_value.tokens_mut())?,
                Token::ExecForm(exec_form) => self.rewrite_tokens(exec_form.tokens_mut())?,
                Token::Leaf(_) | Token::LineContinuation(_) | Token::Comment(_) | Token::Instruction(_) => {}
            }
        }
        Ok(())
    }

    pub(crate) fn rewrite_literal(&self, literal: &mut LiteralToken) -> Result<()> {
        if !literal.can_contain_variables() {
            return Ok(());
        }
        for token in literal.tokens_mut().iter_mut() {
            match token {
                Token::VariableRef(variable) => {
                    let value = self.expand(variable)?;
                    *token = Token::fragment(value);
                }
                Token::Leaf(leaf) if self.remove_escape_characters && leaf.kind() == LeafKind::StringFragment => {
                    let text = remove_escape_characters(leaf.text(), self.escape_char);
                    leaf.set_text(text);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The expanded value of a single reference.
    fn expand(&self, variable: &VariableRefToken) -> Result<String> {
        let name = variable.name();
        let value = match self.variables.get(name) {
            None if self.undeclared == UndeclaredVariables::PassThrough => {
                trace!(name; "Leaving undeclared variable unresolved");
                return Ok(variable.to_string());
            }
            None => None,
            Some(value) => value.as_deref(),
        };

        let Some(modifier) = variable.modifier() else {
            trace!(name, value:?; "Substituting variable");
            return Ok(value.unwrap_or_default().to_string());
        };

        let is_set = value.is_some_and(|value| !(modifier.treats_empty_as_unset() && value.is_empty()));
        let expanded = match modifier {
            Modifier::DefaultIfUnset | Modifier::DefaultIfUnsetOrEmpty if is_set => value.unwrap_or_default().to_string(),
            Modifier::DefaultIfUnset | Modifier::DefaultIfUnsetOrEmpty => self.expand_word(variable)?,
            Modifier::AlternateIfSet | Modifier::AlternateIfSetAndNonEmpty if is_set => self.expand_word(variable)?,
            Modifier::AlternateIfSet | Modifier::AlternateIfSetAndNonEmpty => String::new(),
            Modifier::ErrorIfUnset | Modifier::ErrorIfUnsetOrEmpty if is_set => value.unwrap_or_default().to_string(),
            Modifier::ErrorIfUnset | Modifier::ErrorIfUnsetOrEmpty => {
                let word = self.expand_word(variable)?;
                let message = if word.is_empty() {
                    format!("{name}: parameter null or not set")
                } else {
                    word
                };
                return Err(Error::VariableUnset {
                    name: name.to_string(),
                    message,
                });
            }
        };
        trace!(name, modifier:% = modifier, value = expanded.as_str(); "Substituting variable");
        Ok(expanded)
    }

    /// The modifier word with its own references expanded.
    fn expand_word(&self, variable: &VariableRefToken) -> Result<String> {
        let Some(word) = variable.modifier_value_token() else {
            return Ok(String::new());
        };
        let mut word = word.clone();
        self.rewrite_literal(&mut word)?;
        Ok(word.value())
    }
}

/// Drop each escape char, keeping the character it escapes.
fn remove_escape_characters(text: &str, escape_char: char) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == escape_char {
            match chars.next() {
                Some(escaped) => result.push(escaped),
                None => result.push(c),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Rewrite `target` on a working copy and return the resolved text. The
/// copy replaces `target` only when `update_inline` is set.
pub(crate) fn resolve_aggregate<T>(target: &mut T, resolver: &Resolver<'_>, update_inline: bool) -> Result<String>
where
    T: Aggregate + Clone,
{
    let mut working = target.clone();
    resolver.rewrite_tokens(working.tokens_mut())?;
    let text = working.to_string();
    if update_inline {
        *target = working;
    }
    Ok(text)
}

/// Expand every variable reference in `text`.
///
/// Names missing from `variables` resolve to the empty string. An escaped
/// `$` is not expanded and stays in the output together with its escape
/// char.
///
/// # Examples
///
/// ```
/// use dockerfile_model_syntax::{VariableMap, resolve};
///
/// let mut variables = VariableMap::new();
/// variables.insert("TAG".to_string(), Some("test".to_string()));
/// let resolved = resolve("alpine:prefix-$TAG", &variables, '\\').unwrap();
/// assert_eq!(resolved, "alpine:prefix-test");
/// ```
pub fn resolve(text: &str, variables: &VariableMap, escape_char: char) -> Result<String> {
    let mut literal = parse::parse_complete(text, parse::literal_token(escape_char, parse::LiteralGrammar::TEXT))?;
    literal.resolve_variables(escape_char, variables, ResolutionOptions::default())
}

impl LiteralToken {
    /// Expand the variable references in this literal and return the
    /// resulting text, quotes included.
    pub fn resolve_variables(
        &mut self,
        escape_char: char,
        variables: &VariableMap,
        options: ResolutionOptions,
    ) -> Result<String> {
        let resolver = Resolver::new(escape_char, variables, UndeclaredVariables::Empty)
            .removing_escape_characters(options.remove_escape_characters);
        let mut working = self.clone();
        resolver.rewrite_literal(&mut working)?;
        let text = working.to_string();
        if options.update_inline {
            *self = working;
        }
        Ok(text)
    }
}

impl Instruction {
    /// Expand the variable references in this instruction against
    /// `variables` and return the resulting instruction text.
    ///
    /// Names missing from `variables` resolve to the empty string.
    pub fn resolve_variables(&mut self, variables: &VariableMap, options: ResolutionOptions) -> Result<String> {
        let resolver = Resolver::new(self.escape_char(), variables, UndeclaredVariables::Empty)
            .removing_escape_characters(options.remove_escape_characters);
        resolve_aggregate(self, &resolver, options.update_inline)
    }

    /// The instruction text with declared variables expanded. References to
    /// names missing from `variables` are kept as written.
    pub fn resolve_arg_values(&self, variables: &VariableMap) -> Result<String> {
        let resolver = Resolver::new(self.escape_char(), variables, UndeclaredVariables::PassThrough);
        let mut working = self.clone();
        resolver.rewrite_tokens(working.tokens_mut())?;
        Ok(working.to_string())
    }
}
