//! Lossless token tree for Dockerfile text.
//!
//! Every piece of input, including whitespace, line continuations and
//! comments, ends up in exactly one token. Rendering a token with
//! [`Display`](fmt::Display) concatenates its leaves in order, so parsing
//! followed by `to_string()` reproduces the input byte for byte.
//!
//! # Overview
//!
//! - [`LeafToken`] holds a run of text tagged with a [`LeafKind`].
//! - Composite tokens ([`LiteralToken`], [`VariableRefToken`],
//!   [`KeyValueToken`], [`LineContinuationToken`], [`CommentToken`],
//!   [`ExecFormToken`] and every instruction) own an ordered child list and
//!   implement [`Aggregate`].
//! - [`Token`] is the tagged union stored in child lists. Lookups filter by
//!   variant instead of inspecting types at runtime.
//!
//! A child is identified by its index in the owning list. Edits go through
//! [`Aggregate::set_token`], which replaces in place, so neighbouring tokens
//! keep their position and formatting.

mod comment;
mod exec_form;
mod key_value;
mod line_continuation;
mod literal;
mod variable_ref;

pub use comment::CommentToken;
pub use exec_form::ExecFormToken;
pub use key_value::KeyValueToken;
pub use line_continuation::LineContinuationToken;
pub use literal::LiteralToken;
pub use variable_ref::{Modifier, VariableRefToken};

use std::fmt;

use crate::instruction::Instruction;

/// Implements [`Aggregate`] and exact-text `Display` for a struct with a
/// `tokens: Vec<Token>` field.
macro_rules! aggregate_token {
    ($ty:ty) => {
        impl $crate::token::Aggregate for $ty {
            fn tokens(&self) -> &[$crate::token::Token] {
                &self.tokens
            }

            fn tokens_mut(&mut self) -> &mut Vec<$crate::token::Token> {
                &mut self.tokens
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                self.tokens
                    .iter()
                    .try_for_each(|token| ::std::fmt::Display::fmt(token, f))
            }
        }
    };
}

pub(crate) use aggregate_token;

/// The kind of a [`LeafToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// An instruction keyword or a keyword inside an instruction (`AS`).
    Keyword,
    /// Punctuation: `=`, `[`, `]`, `,`, quotes, braces, `--`, the escape char.
    Symbol,
    /// A run of spaces and tabs.
    Whitespace,
    /// `\n` or `\r\n`.
    NewLine,
    /// Raw literal text.
    StringFragment,
    /// The `#` that starts a comment.
    CommentMarker,
    /// A name: variable, argument, stage or directive name.
    Identifier,
    /// A variable modifier such as `:-`.
    Operator,
    /// The `$` that starts a variable reference.
    VariableRefMarker,
}

/// An atomic run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafToken {
    kind: LeafKind,
    text: String,
}

impl LeafToken {
    /// Create a leaf of the given kind.
    pub fn new(kind: LeafKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// The kind tag.
    pub fn kind(&self) -> LeafKind {
        self.kind
    }

    /// The exact text of this leaf.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text of this leaf, keeping its kind.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl fmt::Display for LeafToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A node of the token tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Leaf(LeafToken),
    Literal(LiteralToken),
    VariableRef(VariableRefToken),
    KeyValue(KeyValueToken),
    LineContinuation(LineContinuationToken),
    Comment(CommentToken),
    ExecForm(ExecFormToken),
    /// A nested instruction, as wrapped by `ONBUILD`.
    Instruction(Box<Instruction>),
}

impl Token {
    /// Create a leaf token.
    pub fn leaf(kind: LeafKind, text: impl Into<String>) -> Self {
        Token::Leaf(LeafToken::new(kind, text))
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::Keyword, text)
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::Symbol, text)
    }

    pub fn whitespace(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::Whitespace, text)
    }

    pub fn newline(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::NewLine, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::StringFragment, text)
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::Identifier, text)
    }

    pub fn operator(text: impl Into<String>) -> Self {
        Self::leaf(LeafKind::Operator, text)
    }

    /// The leaf, if this token is one.
    pub fn as_leaf(&self) -> Option<&LeafToken> {
        match self {
            Token::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// The leaf kind, if this token is a leaf.
    pub fn leaf_kind(&self) -> Option<LeafKind> {
        self.as_leaf().map(LeafToken::kind)
    }

    /// Returns `true` if this is a leaf of `kind` with exactly `text`.
    pub fn is_leaf(&self, kind: LeafKind, text: &str) -> bool {
        self.as_leaf()
            .is_some_and(|leaf| leaf.kind == kind && leaf.text == text)
    }

    pub fn as_literal(&self) -> Option<&LiteralToken> {
        match self {
            Token::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_literal_mut(&mut self) -> Option<&mut LiteralToken> {
        match self {
            Token::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_variable_ref(&self) -> Option<&VariableRefToken> {
        match self {
            Token::VariableRef(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_key_value(&self) -> Option<&KeyValueToken> {
        match self {
            Token::KeyValue(key_value) => Some(key_value),
            _ => None,
        }
    }

    pub fn as_key_value_mut(&mut self) -> Option<&mut KeyValueToken> {
        match self {
            Token::KeyValue(key_value) => Some(key_value),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&CommentToken> {
        match self {
            Token::Comment(comment) => Some(comment),
            _ => None,
        }
    }

    pub fn as_exec_form(&self) -> Option<&ExecFormToken> {
        match self {
            Token::ExecForm(exec_form) => Some(exec_form),
            _ => None,
        }
    }

    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Token::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    /// Returns `true` for tokens that only separate arguments: whitespace,
    /// line continuations and the comments embedded after them.
    pub fn is_separator(&self) -> bool {
        match self {
            Token::Leaf(leaf) => leaf.kind == LeafKind::Whitespace,
            Token::LineContinuation(_) | Token::Comment(_) => true,
            _ => false,
        }
    }

    /// Returns `true` for tokens that end an instruction's content:
    /// separators and newlines.
    pub fn is_trivia(&self) -> bool {
        self.is_separator() || self.leaf_kind() == Some(LeafKind::NewLine)
    }

    /// The child tokens of a composite token; empty for leaves.
    pub fn children(&self) -> &[Token] {
        match self {
            Token::Leaf(_) => &[],
            Token::Literal(token) => token.tokens(),
            Token::VariableRef(token) => token.tokens(),
            Token::KeyValue(token) => token.tokens(),
            Token::LineContinuation(token) => token.tokens(),
            Token::Comment(token) => token.tokens(),
            Token::ExecForm(token) => token.tokens(),
            Token::Instruction(token) => token.tokens(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Leaf(token) => fmt::Display::fmt(token, f),
            Token::Literal(token) => fmt::Display::fmt(token, f),
            Token::VariableRef(token) => fmt::Display::fmt(token, f),
            Token::KeyValue(token) => fmt::Display::fmt(token, f),
            Token::LineContinuation(token) => fmt::Display::fmt(token, f),
            Token::Comment(token) => fmt::Display::fmt(token, f),
            Token::ExecForm(token) => fmt::Display::fmt(token, f),
            Token::Instruction(token) => fmt::Display::fmt(token, f),
        }
    }
}

impl From<LeafToken> for Token {
    fn from(token: LeafToken) -> Self {
        Token::Leaf(token)
    }
}

impl From<LiteralToken> for Token {
    fn from(token: LiteralToken) -> Self {
        Token::Literal(token)
    }
}

impl From<VariableRefToken> for Token {
    fn from(token: VariableRefToken) -> Self {
        Token::VariableRef(token)
    }
}

impl From<KeyValueToken> for Token {
    fn from(token: KeyValueToken) -> Self {
        Token::KeyValue(token)
    }
}

impl From<LineContinuationToken> for Token {
    fn from(token: LineContinuationToken) -> Self {
        Token::LineContinuation(token)
    }
}

impl From<CommentToken> for Token {
    fn from(token: CommentToken) -> Self {
        Token::Comment(token)
    }
}

impl From<ExecFormToken> for Token {
    fn from(token: ExecFormToken) -> Self {
        Token::ExecForm(token)
    }
}

impl From<Instruction> for Token {
    fn from(instruction: Instruction) -> Self {
        Token::Instruction(Box::new(instruction))
    }
}

/// Inserts a token at a position chosen by the owning grammar.
pub type AddToken<'f> = &'f dyn Fn(&mut Vec<Token>, Token);

/// Removes the token at an index, together with any neighbours the owning
/// grammar ties to it.
pub type RemoveToken<'f> = &'f dyn Fn(&mut Vec<Token>, usize);

/// A composite token owning an ordered, mutable list of children.
///
/// The list order is the serialization order. All structural edits funnel
/// through [`set_token`](Aggregate::set_token) so that the list stays
/// contiguous and untouched neighbours keep their identity and position.
pub trait Aggregate: fmt::Display {
    /// The children in serialization order.
    fn tokens(&self) -> &[Token];

    /// Mutable access to the children.
    fn tokens_mut(&mut self) -> &mut Vec<Token>;

    /// Index of the first child matching `predicate`.
    fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&Token) -> bool,
        Self: Sized,
    {
        self.tokens().iter().position(predicate)
    }

    /// Replace, insert or remove a single child.
    ///
    /// - `current` and `replacement` both set: `replacement` takes the slot
    ///   of `current`.
    /// - only `current` set: `remove_token` is invoked with its index, or the
    ///   child alone is removed.
    /// - only `replacement` set: `add_token` places it, or it is appended.
    /// - neither set: nothing happens.
    ///
    /// An index past the end of the list counts as absent.
    fn set_token(
        &mut self,
        current: Option<usize>,
        replacement: Option<Token>,
        add_token: Option<AddToken<'_>>,
        remove_token: Option<RemoveToken<'_>>,
    ) {
        let tokens = self.tokens_mut();
        let current = current.filter(|&index| index < tokens.len());

        match (current, replacement) {
            (Some(index), Some(replacement)) => tokens[index] = replacement,
            (Some(index), None) => match remove_token {
                Some(remove) => remove(tokens, index),
                None => {
                    tokens.remove(index);
                }
            },
            (None, Some(replacement)) => match add_token {
                Some(add) => add(tokens, replacement),
                None => tokens.push(replacement),
            },
            (None, None) => {}
        }
    }

    /// Remove the inclusive range between two children, in whichever order
    /// they appear.
    fn remove_range(&mut self, first: usize, second: usize) {
        remove_range(self.tokens_mut(), first, second);
    }
}

/// Remove the inclusive slice between `first` and `second`, regardless of
/// which comes first. Indices past the end are clamped.
pub fn remove_range(tokens: &mut Vec<Token>, first: usize, second: usize) {
    if tokens.is_empty() {
        return;
    }
    let last = tokens.len() - 1;
    let start = first.min(second).min(last);
    let end = first.max(second).min(last);
    tokens.drain(start..=end);
}

/// Visit `tokens` and all their descendants in document order.
pub(crate) fn walk<'a, F>(tokens: &'a [Token], visit: &mut F)
where
    F: FnMut(&'a Token),
{
    for token in tokens {
        visit(token);
        walk(token.children(), visit);
    }
}

/// A construct whose text may embed comment lines inside line continuations.
pub trait Commentable {
    /// All comment tokens inside this construct, in document order.
    fn comment_tokens(&self) -> Vec<&CommentToken>;

    /// The text of every embedded comment.
    fn comments(&self) -> Vec<String> {
        self.comment_tokens()
            .into_iter()
            .map(CommentToken::text)
            .collect()
    }
}

impl<T: Aggregate> Commentable for T {
    fn comment_tokens(&self) -> Vec<&CommentToken> {
        let mut comments = Vec::new();
        walk(self.tokens(), &mut |token| {
            if let Token::Comment(comment) = token {
                comments.push(comment);
            }
        });
        comments
    }
}
