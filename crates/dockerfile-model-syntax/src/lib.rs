//! # Dockerfile Model Syntax
//!
//! A lossless token model of Dockerfile syntax. Parsing keeps every byte of
//! the input, including whitespace, line continuations and comments, so an
//! unmodified tree serializes back to the exact text it came from. Edits made
//! through the typed accessors touch only the tokens they replace.
//!
//! ## Usage
//!
//! ```
//! # use dockerfile_model_syntax::{Dockerfile, ResolutionOptions, VariableMap};
//! # fn main() -> Result<(), dockerfile_model_syntax::Error> {
//! let text = "ARG TAG=3.19\nFROM alpine:${TAG} AS base\nRUN apk add curl\n";
//! let mut dockerfile = Dockerfile::parse(text)?;
//! assert_eq!(dockerfile.to_string(), text);
//!
//! let resolved = dockerfile.resolve_variables(&VariableMap::new(), ResolutionOptions::default())?;
//! assert!(resolved.contains("FROM alpine:3.19 AS base"));
//! # Ok(())
//! # }
//! ```

pub mod instruction;
pub mod parse;
pub mod token;

mod construct;
mod dockerfile;
mod error;
mod resolve;
mod stages;

pub use construct::{Construct, DIRECTIVE_NAMES, ParserDirective, Whitespace};
pub use dockerfile::{DEFAULT_ESCAPE_CHAR, Dockerfile};
pub use error::{Error, ErrorCode, ParseError, Position, Result};
pub use resolve::{ResolutionOptions, UndeclaredVariables, VariableMap, resolve};
pub use stages::{Stage, StagesView};
