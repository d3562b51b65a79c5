//! Configuration file loading for the CLI
//!
//! The configuration supplies default build arguments and resolution
//! options. It is read from the first of these that applies: the path given
//! with `--config`, `dockerfile-model/config.toml` in the working directory,
//! or `config.toml` in the platform config directory. Without any of them the
//! defaults are used.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use dockerfile_model::{ModelError, config::AppConfig, syntax::instruction::is_arg_name};

const LOCAL_CONFIG: &str = "dockerfile-model/config.toml";

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Build argument `{name}` in {path} is not a valid ARG name")]
    InvalidBuildArg { path: PathBuf, name: String },
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Config(err.to_string())
    }
}

/// Where a configuration file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    /// Given with `--config`; it must exist.
    Explicit(PathBuf),
    Local(PathBuf),
    System(PathBuf),
}

impl ConfigSource {
    fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Local(path) | ConfigSource::System(path) => path,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(_) => write!(f, "explicit"),
            ConfigSource::Local(_) => write!(f, "local"),
            ConfigSource::System(_) => write!(f, "system"),
        }
    }
}

/// Find and load the configuration.
///
/// # Errors
///
/// Returns `ModelError::Config` if the explicit path does not exist, if the
/// file is not valid TOML for [`AppConfig`], or if it declares a build
/// argument whose name could never match an `ARG`.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, ModelError> {
    match find_config(explicit_path.as_ref().map(AsRef::as_ref)) {
        Some(source) => {
            info!(source:%, path = source.path().display().to_string(); "Loading configuration");
            load_config_file(source.path())
        }
        None => {
            debug!("No configuration file found, using default configuration");
            Ok(AppConfig::default())
        }
    }
}

fn find_config(explicit_path: Option<&Path>) -> Option<ConfigSource> {
    if let Some(path) = explicit_path {
        return Some(ConfigSource::Explicit(path.to_path_buf()));
    }

    let local = Path::new(LOCAL_CONFIG);
    if local.exists() {
        return Some(ConfigSource::Local(local.to_path_buf()));
    }

    let Some(proj_dirs) = ProjectDirs::from("com", "dockerfile-model", "dockerfile-model") else {
        debug!("Could not determine platform-specific config directory");
        return None;
    };
    let system = proj_dirs.config_dir().join("config.toml");
    if system.exists() {
        return Some(ConfigSource::System(system));
    }
    debug!(path = system.display().to_string(); "System configuration file not found");
    None
}

fn load_config_file(path: &Path) -> Result<AppConfig, ModelError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let invalid = config
        .resolve()
        .build_args()
        .keys()
        .find(|name| !is_arg_name(name));
    if let Some(name) = invalid {
        return Err(ConfigError::InvalidBuildArg {
            path: path.to_path_buf(),
            name: name.clone(),
        }
        .into());
    }

    debug!(build_args = config.resolve().build_args().len(); "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[resolve.build_args]\nTAG = \"edge\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.resolve().build_args()["TAG"], "edge");
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("custom.toml");
        let source = find_config(Some(path.as_path())).unwrap();
        assert_eq!(source, ConfigSource::Explicit(path));
        assert_eq!(source.to_string(), "explicit");
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[resolve\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML configuration in"));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_invalid_build_arg_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[resolve.build_args]\n\"MY TAG\" = \"edge\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Build argument `MY TAG`"));
    }
}
