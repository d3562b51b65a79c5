//! CLI logic for the `dockerfile-model` tool.
//!
//! The tool parses a Dockerfile and writes one of three outputs: the
//! re-serialised document (a round-trip check), the document with variable
//! references resolved, or a listing of its global arguments and stages.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{
    fs,
    io::{self, Write as _},
};

use log::{info, warn};

use dockerfile_model::{Dockerfile, DockerfileProcessor, ModelError, VariableMap};

/// Run the `dockerfile-model` CLI application
///
/// # Errors
///
/// Returns `ModelError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing errors
/// - Resolution errors
/// - Serialised text that differs from the input
pub fn run(args: &Args) -> Result<(), ModelError> {
    info!(
        input_path = args.input,
        resolve = args.resolve,
        stages = args.stages;
        "Processing Dockerfile"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let processor = DockerfileProcessor::new(app_config);

    let source = fs::read_to_string(&args.input)?;
    let mut dockerfile = processor.parse(&source)?;

    let output = if args.stages {
        describe_stages(&dockerfile)
    } else if args.resolve {
        processor.resolve(&mut dockerfile, &build_args(args))?
    } else {
        let text = dockerfile.to_string();
        if text != source {
            return Err(ModelError::RoundTrip {
                path: args.input.clone(),
            });
        }
        text
    };

    if !args.build_args.is_empty() && !args.resolve {
        warn!("Build arguments are only used with --resolve");
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &output)?;
            info!(output_file = path; "Output written");
        }
        None => io::stdout().write_all(output.as_bytes())?,
    }

    Ok(())
}

fn build_args(args: &Args) -> VariableMap {
    args.build_args.iter().cloned().collect()
}

/// One line per global argument, then one block per stage.
fn describe_stages(dockerfile: &Dockerfile) -> String {
    let view = dockerfile.stages();
    let mut lines = Vec::new();

    for declaration in view.global_args().flat_map(|arg| arg.declarations()) {
        lines.push(match declaration.value() {
            Some(value) => format!("ARG {}={value}", declaration.key()),
            None => format!("ARG {}", declaration.key()),
        });
    }

    for stage in view.stages() {
        let from = stage.from_instruction();
        lines.push(match stage.name() {
            Some(name) => format!("stage {} ({name}): {}", stage.index(), from.image_name()),
            None => format!("stage {}: {}", stage.index(), from.image_name()),
        });
        if let Some(platform) = from.platform() {
            lines.push(format!("  platform: {platform}"));
        }
        let args: Vec<String> = stage.args().flat_map(|arg| arg.names()).collect();
        if !args.is_empty() {
            lines.push(format!("  args: {}", args.join(", ")));
        }
        lines.push(format!("  instructions: {}", stage.instructions().count()));
    }

    lines.iter().map(|line| format!("{line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_stages() {
        let dockerfile = Dockerfile::parse(
            "ARG BASE=alpine\nARG TAG\nFROM --platform=linux/amd64 $BASE AS build\nARG TAG\nRUN make\nFROM scratch\n",
        )
        .unwrap();

        assert_eq!(
            describe_stages(&dockerfile),
            "\
ARG BASE=alpine
ARG TAG
stage 0 (build): $BASE
  platform: linux/amd64
  args: TAG
  instructions: 3
stage 1: scratch
  instructions: 1
"
        );
    }
}
