//! The whole document.

use std::fmt;

use log::debug;
use winnow::{Parser, combinator::opt, stream::Stream};

use crate::{
    construct::{self, Construct, ParserDirective},
    error::{Error, ParseError, Result},
    instruction::{ArgInstruction, Instruction},
    parse::{self, Input, PResult},
    resolve::{ResolutionOptions, Resolver, UndeclaredVariables, VariableMap},
    stages::{self, StagesView},
    token::Aggregate,
};

/// The escape char used when no `escape` directive is present.
pub const DEFAULT_ESCAPE_CHAR: char = '\\';

/// A parsed Dockerfile: parser directives, comments, blank lines and
/// instructions in document order.
///
/// `to_string()` reproduces the parsed text exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dockerfile {
    items: Vec<Construct>,
}

impl Dockerfile {
    pub fn new(items: Vec<Construct>) -> Self {
        Self { items }
    }

    /// Parse a complete Dockerfile.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockerfile_model_syntax::Dockerfile;
    ///
    /// let text = "# escape=`\nFROM mcr.microsoft.com/windows AS base\nRUN dir `\n    c:\\\n";
    /// let dockerfile = Dockerfile::parse(text).unwrap();
    /// assert_eq!(dockerfile.escape_char(), '`');
    /// assert_eq!(dockerfile.to_string(), text);
    /// ```
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        let items = parse::parse_complete(text, document)?;
        let dockerfile = Self { items };
        debug!(
            items = dockerfile.items.len(),
            escape_char:% = dockerfile.escape_char();
            "Parsed Dockerfile"
        );
        Ok(dockerfile)
    }

    pub fn items(&self) -> &[Construct] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Construct> {
        &mut self.items
    }

    /// The escape char from the `escape` directive, or `\`.
    pub fn escape_char(&self) -> char {
        self.items
            .iter()
            .map_while(Construct::as_parser_directive)
            .find_map(ParserDirective::escape_char)
            .unwrap_or(DEFAULT_ESCAPE_CHAR)
    }

    /// The parser directives at the top of the file.
    pub fn parser_directives(&self) -> impl Iterator<Item = &ParserDirective> {
        self.items.iter().map_while(Construct::as_parser_directive)
    }

    /// All top-level instructions in document order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter().filter_map(Construct::as_instruction)
    }

    pub fn instructions_mut(&mut self) -> impl Iterator<Item = &mut Instruction> {
        self.items.iter_mut().filter_map(Construct::as_instruction_mut)
    }

    /// The global arguments and the build stages.
    pub fn stages(&self) -> StagesView<'_> {
        StagesView::new(&self.items)
    }

    /// Expand variables across the whole document and return the resolved
    /// text.
    ///
    /// Global `ARG`s take their value from `build_args`, else from their
    /// default. Every `FROM` is resolved against the global arguments. Inside
    /// a stage, only arguments declared in that stage are visible; an `ARG`
    /// without a default inherits the global value of the same name, and
    /// `ENV` assignments are visible to later instructions of the stage.
    pub fn resolve_variables(&mut self, build_args: &VariableMap, options: ResolutionOptions) -> Result<String> {
        let working = self.resolve_items(build_args, options, None)?;
        let text = working.iter().map(ToString::to_string).collect();
        if options.update_inline {
            self.items = working;
        }
        Ok(text)
    }

    /// Expand the variables of a single instruction with the scope it has at
    /// its position in the document.
    ///
    /// `position` counts instructions in the order of
    /// [`instructions`](Self::instructions), starting at 0.
    pub fn resolve_instruction_variables(
        &mut self,
        position: usize,
        build_args: &VariableMap,
        options: ResolutionOptions,
    ) -> Result<String> {
        let index = self
            .instruction_index(position)
            .ok_or(Error::InstructionNotFound(position))?;
        let mut working = self.resolve_items(build_args, options, Some(index))?;
        let resolved = working.swap_remove(index);
        let text = resolved.to_string();
        if options.update_inline {
            self.items[index] = resolved;
        }
        Ok(text)
    }

    /// Item index of the instruction at `position`.
    fn instruction_index(&self, position: usize) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.as_instruction().is_some())
            .map(|(index, _)| index)
            .nth(position)
    }

    /// Resolve a copy of the items, stopping after `target` when given.
    fn resolve_items(
        &self,
        build_args: &VariableMap,
        options: ResolutionOptions,
        target: Option<usize>,
    ) -> Result<Vec<Construct>> {
        let escape_char = self.escape_char();
        let remove = options.remove_escape_characters;
        let layout = stages::layout(&self.items);
        let mut working = self.items.clone();

        let mut globals = VariableMap::new();
        for index in layout.global.clone() {
            if let Construct::Instruction(instruction) = &mut working[index] {
                match instruction {
                    Instruction::Arg(arg) => declare(arg, &mut globals, None, build_args, escape_char, remove)?,
                    other => Resolver::new(escape_char, &globals, UndeclaredVariables::Empty)
                        .removing_escape_characters(remove)
                        .rewrite_tokens(other.tokens_mut())?,
                }
            }
            if target == Some(index) {
                return Ok(working);
            }
        }

        for (stage, range) in layout.stages.iter().enumerate() {
            debug!(stage, start = range.start; "Resolving stage");
            let mut scope = VariableMap::new();
            for index in range.clone() {
                if let Construct::Instruction(instruction) = &mut working[index] {
                    match instruction {
                        Instruction::From(from) => Resolver::new(escape_char, &globals, UndeclaredVariables::Empty)
                            .removing_escape_characters(remove)
                            .rewrite_tokens(from.tokens_mut())?,
                        Instruction::Arg(arg) => declare(arg, &mut scope, Some(&globals), build_args, escape_char, remove)?,
                        Instruction::Env(env) => {
                            Resolver::new(escape_char, &scope, UndeclaredVariables::Empty)
                                .removing_escape_characters(remove)
                                .rewrite_tokens(env.tokens_mut())?;
                            for (name, value) in env.variables() {
                                scope.insert(name, Some(value));
                            }
                        }
                        other => Resolver::new(escape_char, &scope, UndeclaredVariables::Empty)
                            .removing_escape_characters(remove)
                            .rewrite_tokens(other.tokens_mut())?,
                    }
                }
                if target == Some(index) {
                    return Ok(working);
                }
            }
        }
        Ok(working)
    }
}

/// Resolve the defaults of an `ARG` instruction left to right, adding each
/// declaration to `scope` as it goes.
fn declare(
    arg: &mut ArgInstruction,
    scope: &mut VariableMap,
    globals: Option<&VariableMap>,
    build_args: &VariableMap,
    escape_char: char,
    remove_escape_characters: bool,
) -> Result<()> {
    for declaration in arg.declarations_mut() {
        Resolver::new(escape_char, scope, UndeclaredVariables::Empty)
            .removing_escape_characters(remove_escape_characters)
            .rewrite_tokens(declaration.tokens_mut())?;

        let name = declaration.key().to_string();
        let value = build_args
            .get(&name)
            .cloned()
            .flatten()
            .or_else(|| declaration.value())
            .or_else(|| globals.and_then(|globals| globals.get(&name).cloned().flatten()));
        scope.insert(name, value);
    }
    Ok(())
}

fn document(input: &mut Input<'_>) -> PResult<Vec<Construct>> {
    let mut items = Vec::new();
    let mut escape_char = DEFAULT_ESCAPE_CHAR;
    let mut seen: Vec<String> = Vec::new();

    loop {
        let checkpoint = input.checkpoint();
        let Some(directive) = opt(ParserDirective::parser()).parse_next(input)? else {
            break;
        };
        let name = directive.name().to_ascii_lowercase();
        if seen.contains(&name) {
            input.reset(&checkpoint);
            break;
        }
        if let Some(escape) = directive.escape_char() {
            escape_char = escape;
        }
        seen.push(name);
        items.push(Construct::ParserDirective(directive));
    }

    while !input.is_empty() {
        items.push(construct::construct(escape_char).parse_next(input)?);
    }
    Ok(items)
}

impl fmt::Display for Dockerfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.items.iter().try_for_each(|item| fmt::Display::fmt(item, f))
    }
}

impl std::str::FromStr for Dockerfile {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn name_strategy() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9_]{0,8}"
    }

    /// A word that may embed variable references.
    fn word_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z0-9][a-z0-9._/:-]{0,12}",
            name_strategy().prop_map(|name| format!("${name}")),
            name_strategy().prop_map(|name| format!("pre-${{{name}}}")),
            (name_strategy(), "[a-z0-9.]{0,6}").prop_map(|(name, word)| format!("${{{name}:-{word}}}")),
            (name_strategy(), "[a-z0-9.]{0,6}").prop_map(|(name, word)| format!("${{{name}+{word}}}")),
        ]
    }

    fn line_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (word_strategy(), proptest::option::of("[a-z][a-z0-9]{0,6}")).prop_map(|(image, stage)| match stage {
                Some(stage) => format!("FROM {image} AS {stage}"),
                None => format!("FROM {image}"),
            }),
            (name_strategy(), proptest::option::of(word_strategy())).prop_map(|(name, value)| match value {
                Some(value) => format!("ARG {name}={value}"),
                None => format!("ARG {name}"),
            }),
            (name_strategy(), word_strategy()).prop_map(|(name, value)| format!("ENV {name}={value}")),
            (name_strategy(), "[a-z0-9 .]{0,12}").prop_map(|(name, text)| format!("LABEL {name}=\"{text}\"")),
            (word_strategy(), word_strategy()).prop_map(|(src, dst)| format!("COPY {src} {dst}")),
            ("[a-z][a-z0-9 $./-]{0,20}", "[a-z][a-z0-9 ./-]{0,10}")
                .prop_map(|(first, second)| format!("RUN {first} \\\n    {second}")),
            "[a-z][a-z0-9 $]{0,12}".prop_map(|command| format!("CMD {command}")),
            "[a-z ]{0,20}".prop_map(|text| format!("# {text}")),
            Just(String::new()),
        ]
    }

    fn dockerfile_strategy() -> impl Strategy<Value = String> {
        (
            proptest::collection::vec((line_strategy(), proptest::bool::ANY, proptest::bool::ANY), 0..12),
            proptest::bool::ANY,
        )
            .prop_map(|(lines, final_newline)| {
                let mut text = String::new();
                for (line, indent, crlf) in lines {
                    if indent && !line.is_empty() {
                        text.push_str("  ");
                    }
                    text.push_str(&line);
                    text.push_str(if crlf { "\r\n" } else { "\n" });
                }
                if !final_newline && text.ends_with('\n') {
                    let trimmed = text.trim_end_matches(['\r', '\n']).len();
                    text.truncate(trimmed);
                }
                text
            })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Parsing then serializing reproduces the input exactly.
    fn check_round_trip(text: &str) -> std::result::Result<(), TestCaseError> {
        match Dockerfile::parse(text) {
            Ok(dockerfile) => prop_assert_eq!(dockerfile.to_string(), text),
            Err(err) => return Err(TestCaseError::fail(format!("Failed to parse `{text:?}`: {err}"))),
        }
        Ok(())
    }

    /// A second inline resolution changes neither the text nor the tree.
    fn check_resolution_is_idempotent(text: &str) -> std::result::Result<(), TestCaseError> {
        let options = ResolutionOptions {
            update_inline: true,
            remove_escape_characters: false,
        };
        let Ok(mut dockerfile) = Dockerfile::parse(text) else {
            return Err(TestCaseError::fail(format!("Failed to parse `{text:?}`")));
        };
        let first = dockerfile.resolve_variables(&VariableMap::new(), options);
        prop_assert!(first.is_ok(), "First pass failed: {:?}", first.as_ref().err());
        let snapshot = dockerfile.clone();
        let second = dockerfile.resolve_variables(&VariableMap::new(), options);
        prop_assert_eq!(first.ok(), second.ok());
        prop_assert_eq!(dockerfile, snapshot);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn round_trip(text in dockerfile_strategy()) {
            check_round_trip(&text)?;
        }

        #[test]
        fn resolution_is_idempotent(text in dockerfile_strategy()) {
            check_resolution_is_idempotent(&text)?;
        }
    }
}
