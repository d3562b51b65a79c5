//! Configuration types for Dockerfile processing.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! external sources such as a TOML file. Every field has a default, so an
//! empty document yields [`AppConfig::default`].
//!
//! # Example
//!
//! ```
//! # use dockerfile_model::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.resolve().build_args().is_empty());
//! assert!(!config.resolve().update_inline());
//! ```

use indexmap::IndexMap;
use serde::Deserialize;

use dockerfile_model_syntax::{ResolutionOptions, VariableMap};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Variable resolution section.
    #[serde(default)]
    resolve: ResolveConfig,
}

impl AppConfig {
    pub fn new(resolve: ResolveConfig) -> Self {
        Self { resolve }
    }

    /// Returns the resolution configuration.
    pub fn resolve(&self) -> &ResolveConfig {
        &self.resolve
    }
}

/// Settings applied when resolving variable references.
///
/// ```toml
/// [resolve]
/// update_inline = false
/// remove_escape_characters = true
///
/// [resolve.build_args]
/// TAG = "3.20"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveConfig {
    /// Build arguments, in declaration order.
    #[serde(default)]
    build_args: IndexMap<String, String>,

    /// Strip escape characters from resolved values.
    #[serde(default)]
    remove_escape_characters: bool,

    /// Write resolved values back into the document.
    #[serde(default)]
    update_inline: bool,
}

impl ResolveConfig {
    pub fn new(
        build_args: IndexMap<String, String>,
        remove_escape_characters: bool,
        update_inline: bool,
    ) -> Self {
        Self {
            build_args,
            remove_escape_characters,
            update_inline,
        }
    }

    pub fn build_args(&self) -> &IndexMap<String, String> {
        &self.build_args
    }

    pub fn remove_escape_characters(&self) -> bool {
        self.remove_escape_characters
    }

    pub fn update_inline(&self) -> bool {
        self.update_inline
    }

    /// The configured build arguments as a [`VariableMap`].
    pub fn variables(&self) -> VariableMap {
        self.build_args
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect()
    }

    /// The [`ResolutionOptions`] selected by this configuration.
    pub fn options(&self) -> ResolutionOptions {
        ResolutionOptions {
            update_inline: self.update_inline,
            remove_escape_characters: self.remove_escape_characters,
        }
    }
}
