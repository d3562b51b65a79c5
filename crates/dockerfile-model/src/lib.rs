//! Dockerfile Model - parse, edit and resolve Dockerfiles without losing
//! formatting.
//!
//! The token model itself lives in [`dockerfile_model_syntax`], re-exported
//! here as [`syntax`]. This crate adds file handling, configuration and a
//! processor that applies configured build arguments.

pub mod config;

mod error;

pub use dockerfile_model_syntax as syntax;
pub use dockerfile_model_syntax::{Dockerfile, Stage, StagesView, VariableMap};

pub use error::ModelError;

use std::{fs, path::Path};

use log::{debug, info, trace};

use config::AppConfig;

/// Entry point for loading, resolving and saving Dockerfiles.
///
/// # Examples
///
/// ```
/// use dockerfile_model::{DockerfileProcessor, VariableMap};
///
/// let processor = DockerfileProcessor::default();
/// let mut dockerfile = processor
///     .parse("ARG TAG=latest\nFROM alpine:$TAG\n")
///     .expect("Failed to parse");
///
/// let resolved = processor
///     .resolve(&mut dockerfile, &VariableMap::new())
///     .expect("Failed to resolve");
/// assert!(resolved.contains("FROM alpine:latest"));
/// ```
#[derive(Debug, Default)]
pub struct DockerfileProcessor {
    config: AppConfig,
}

impl DockerfileProcessor {
    /// Create a processor with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse Dockerfile text.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Parse`] carrying `source` when the text is not
    /// a valid Dockerfile.
    pub fn parse(&self, source: &str) -> Result<Dockerfile, ModelError> {
        info!("Parsing Dockerfile");
        let dockerfile =
            Dockerfile::parse(source).map_err(|err| ModelError::new_parse_error(err, source))?;
        debug!(items = dockerfile.items().len(); "Dockerfile parsed successfully");
        trace!(dockerfile:?; "Parsed Dockerfile");
        Ok(dockerfile)
    }

    /// Read and parse the Dockerfile at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dockerfile, ModelError> {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading Dockerfile");
        let source = fs::read_to_string(path)?;
        self.parse(&source)
    }

    /// Write the exact text of `dockerfile` to `path`.
    pub fn save(&self, path: impl AsRef<Path>, dockerfile: &Dockerfile) -> Result<(), ModelError> {
        let path = path.as_ref();
        fs::write(path, dockerfile.to_string())?;
        info!(path = path.display().to_string(); "Dockerfile saved");
        Ok(())
    }

    /// Resolve every variable reference in `dockerfile` and return the
    /// resolved text.
    ///
    /// Build arguments from the configuration are applied first, then
    /// `extra_args`, so a name given in both takes the value from
    /// `extra_args`. The document is only modified when the configuration
    /// enables `update_inline`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Syntax`] when a `${NAME?message}` reference
    /// fails. The document is left untouched in that case.
    pub fn resolve(
        &self,
        dockerfile: &mut Dockerfile,
        extra_args: &VariableMap,
    ) -> Result<String, ModelError> {
        let settings = self.config.resolve();
        let mut build_args = settings.variables();
        build_args.extend(extra_args.iter().map(|(name, value)| (name.clone(), value.clone())));

        info!(build_args = build_args.len(), update_inline = settings.update_inline(); "Resolving Dockerfile");
        let resolved = dockerfile.resolve_variables(&build_args, settings.options())?;
        debug!("Dockerfile resolved successfully");
        Ok(resolved)
    }
}
