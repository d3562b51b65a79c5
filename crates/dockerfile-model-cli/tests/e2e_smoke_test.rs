use std::{fs, path::Path};

use tempfile::tempdir;

use dockerfile_model_cli::{Args, run};

const DOCKERFILE: &str = "\
# syntax=docker/dockerfile:1
ARG BASE=alpine
ARG TAG=3.19

# build stage
FROM ${BASE}:${TAG} AS build
ARG TAG
RUN apk add --no-cache \\
      build-base \\
      curl
LABEL version=\"$TAG\"

FROM scratch
COPY --from=build /usr/bin/curl /curl
";

fn args(input: &Path, output: &Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        output: Some(output.to_string_lossy().to_string()),
        config: None,
        build_args: Vec::new(),
        resolve: false,
        stages: false,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_round_trip() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("Dockerfile");
    let output = dir.path().join("out");
    fs::write(&input, DOCKERFILE).unwrap();

    run(&args(&input, &output)).expect("Round trip failed");
    assert_eq!(fs::read_to_string(&output).unwrap(), DOCKERFILE);
}

#[test]
fn e2e_resolve_with_build_args_and_config() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("Dockerfile");
    let output = dir.path().join("out");
    let config = dir.path().join("config.toml");
    fs::write(&input, DOCKERFILE).unwrap();
    fs::write(&config, "[resolve.build_args]\nBASE = \"debian\"\nTAG = \"12\"\n").unwrap();

    let mut args = args(&input, &output);
    args.resolve = true;
    args.config = Some(config.to_string_lossy().to_string());
    args.build_args = vec![("TAG".to_string(), Some("bookworm".to_string()))];

    run(&args).expect("Resolution failed");
    let resolved = fs::read_to_string(&output).unwrap();
    assert!(resolved.contains("FROM debian:bookworm AS build\n"));
    assert!(resolved.contains("LABEL version=\"bookworm\"\n"));
    assert!(resolved.contains("RUN apk add --no-cache \\\n"));
    assert_eq!(fs::read_to_string(&input).unwrap(), DOCKERFILE);
}

#[test]
fn e2e_stages() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("Dockerfile");
    let output = dir.path().join("stages.txt");
    fs::write(&input, DOCKERFILE).unwrap();

    let mut args = args(&input, &output);
    args.stages = true;

    run(&args).expect("Stage listing failed");
    let listing = fs::read_to_string(&output).unwrap();
    assert!(listing.starts_with("ARG BASE=alpine\nARG TAG=3.19\n"));
    assert!(listing.contains("stage 0 (build): ${BASE}:${TAG}\n  args: TAG\n  instructions: 4\n"));
    assert!(listing.contains("stage 1: scratch\n  instructions: 2\n"));
}

#[test]
fn e2e_errors() {
    let dir = tempdir().expect("Failed to create temp directory");
    let output = dir.path().join("out");

    let cases = [
        ("unknown_instruction", "FROM alpine\nFORM x\n"),
        ("bad_substitution", "FROM alpine:${}\n"),
        ("bad_escape_directive", "# escape=x\nFROM alpine\n"),
    ];
    for (name, text) in cases {
        let input = dir.path().join(name);
        fs::write(&input, text).unwrap();
        assert!(run(&args(&input, &output)).is_err(), "{name} unexpectedly succeeded");
    }

    let input = dir.path().join("unset");
    fs::write(&input, "FROM alpine:${TAG:?tag is required}\n").unwrap();
    let mut resolve = args(&input, &output);
    resolve.resolve = true;
    let err = run(&resolve).unwrap_err();
    assert_eq!(err.to_string(), "tag is required");

    let missing = args(&dir.path().join("missing"), &output);
    assert!(run(&missing).is_err());
}
