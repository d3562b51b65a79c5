//! Command-line argument definitions for the `dockerfile-model` CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`].

use std::env;

use clap::Parser;

/// Command-line arguments for the Dockerfile model tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input Dockerfile
    #[arg(help = "Path to the input Dockerfile")]
    pub input: String,

    /// Path to the output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Build argument, `NAME=VALUE`; a bare `NAME` reads the environment
    #[arg(long = "build-arg", value_name = "NAME[=VALUE]", value_parser = parse_build_arg)]
    pub build_args: Vec<(String, Option<String>)>,

    /// Write the document with variable references resolved
    #[arg(long, conflicts_with = "stages")]
    pub resolve: bool,

    /// List global arguments and build stages
    #[arg(long)]
    pub stages: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Parse a `--build-arg` value.
pub fn parse_build_arg(arg: &str) -> Result<(String, Option<String>), String> {
    let (name, value) = match arg.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (arg, env::var(arg).ok()),
    };
    if name.is_empty() {
        return Err(format!("missing build argument name in `{arg}`"));
    }
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_arg() {
        assert_eq!(
            parse_build_arg("TAG=3.20"),
            Ok(("TAG".to_string(), Some("3.20".to_string())))
        );
        assert_eq!(
            parse_build_arg("EMPTY="),
            Ok(("EMPTY".to_string(), Some(String::new())))
        );
        assert_eq!(
            parse_build_arg("URL=http://x?a=b"),
            Ok(("URL".to_string(), Some("http://x?a=b".to_string())))
        );
        assert!(parse_build_arg("=value").is_err());
    }

    #[test]
    fn test_bare_name_without_environment_value() {
        let (name, value) = parse_build_arg("DOCKERFILE_MODEL_SURELY_UNSET_VARIABLE").unwrap();
        assert_eq!(name, "DOCKERFILE_MODEL_SURELY_UNSET_VARIABLE");
        assert_eq!(value, None);
    }

    #[test]
    fn test_command_line() {
        let args = Args::try_parse_from([
            "dockerfile-model",
            "Dockerfile",
            "--resolve",
            "--build-arg",
            "A=1",
            "--build-arg",
            "B=2",
        ])
        .unwrap();
        assert!(args.resolve);
        assert_eq!(args.build_args.len(), 2);
        assert_eq!(args.output, None);

        assert!(Args::try_parse_from(["dockerfile-model", "Dockerfile", "--resolve", "--stages"]).is_err());
    }
}
