//! Integration tests for parsing, editing and resolving through the public
//! API.

use dockerfile_model_syntax::{
    Construct, Dockerfile, ErrorCode, ResolutionOptions, VariableMap,
    instruction::{ArgInstruction, FromInstruction, Instruction},
    resolve,
    token::{Aggregate, Commentable, KeyValueToken, LiteralToken, Token},
};

fn variables(pairs: &[(&str, &str)]) -> VariableMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), Some(value.to_string())))
        .collect()
}

const MULTI_STAGE: &str = "\
# syntax=docker/dockerfile:1.7
ARG GO_VERSION=1.22
ARG APP=server

FROM --platform=$BUILDPLATFORM golang:${GO_VERSION}-alpine AS build
ARG APP
WORKDIR /src
COPY go.mod go.sum ./
RUN --mount=type=cache,target=/go/pkg/mod \\
    # fetch modules first
    go mod download
COPY . .
RUN go build -o /out/${APP} ./cmd/${APP}

FROM gcr.io/distroless/static:nonroot
ARG APP
LABEL org.opencontainers.image.title=\"${APP}\" \\
      org.opencontainers.image.source=\"https://example.com/${APP}\"
COPY --from=build /out/${APP} /app
USER nonroot:nonroot
ENTRYPOINT [\"/app\"]
";

#[test]
fn test_multi_stage_round_trip() {
    let dockerfile = Dockerfile::parse(MULTI_STAGE).unwrap();
    assert_eq!(dockerfile.to_string(), MULTI_STAGE);

    let view = dockerfile.stages();
    assert_eq!(view.global_args().count(), 2);
    assert_eq!(view.stages().len(), 2);
    assert_eq!(view.stage("build").unwrap().instructions().count(), 7);
}

#[test]
fn test_embedded_comments() {
    let dockerfile = Dockerfile::parse(MULTI_STAGE).unwrap();
    let run = dockerfile
        .instructions()
        .find(|instruction| instruction.to_string().contains("go mod download"))
        .unwrap();
    assert_eq!(run.comments(), vec!["fetch modules first".to_string()]);
}

#[test]
fn test_resolve_multi_stage() {
    let mut dockerfile = Dockerfile::parse(MULTI_STAGE).unwrap();
    let resolved = dockerfile
        .resolve_variables(&variables(&[("APP", "worker")]), ResolutionOptions::default())
        .unwrap();

    assert!(resolved.contains("FROM --platform= golang:1.22-alpine AS build\n"));
    assert!(resolved.contains("RUN go build -o /out/${APP} ./cmd/${APP}\n"));
    assert!(resolved.contains("LABEL org.opencontainers.image.title=\"worker\""));
    assert!(resolved.contains("COPY --from=build /out/worker /app\n"));
    assert_eq!(dockerfile.to_string(), MULTI_STAGE);
}

#[test]
fn test_resolve_scenarios() {
    assert_eq!(
        resolve("alpine:prefix-$TAG", &variables(&[("TAG", "test")]), '\\').unwrap(),
        "alpine:prefix-test"
    );
    assert_eq!(resolve("repo:${TAG:-test}", &VariableMap::new(), '\\').unwrap(), "repo:test");
    assert_eq!(resolve("repo:${TAG:-test}", &variables(&[("TAG", "")]), '\\').unwrap(), "repo:test");
    assert_eq!(resolve("repo:${TAG:-test}", &variables(&[("TAG", "foo")]), '\\').unwrap(), "repo:foo");

    let err = resolve("repo:${TAG?err}", &VariableMap::new(), '\\').unwrap_err();
    assert_eq!(err.to_string(), "err");
}

#[test]
fn test_arg_without_name_fails_at_column_five() {
    let err = Instruction::parse("ARG ", '\\').unwrap_err();
    assert_eq!((err.line(), err.column()), (1, 5));
}

#[test]
fn test_set_platform() {
    let mut from = FromInstruction::new("alpine:latest").unwrap();
    from.set_platform(Some("linux/arm64")).unwrap();
    assert_eq!(from.to_string(), "FROM --platform=linux/arm64 alpine:latest");
    from.set_platform(None).unwrap();
    assert_eq!(from.to_string(), "FROM alpine:latest");
}

#[test]
fn test_replacing_a_field_keeps_other_tokens() {
    let mut from = FromInstruction::parse("FROM  --platform=linux/amd64   alpine:3.19 \\\n  AS   base\n", '\\').unwrap();
    let before: Vec<Token> = from.tokens().to_vec();

    let image = LiteralToken::parse("debian:bookworm", '\\', true).unwrap();
    from.set_image_name_token(image);

    let after = from.tokens();
    assert_eq!(before.len(), after.len());
    let changed: Vec<usize> = (0..after.len()).filter(|&index| before[index] != after[index]).collect();
    assert_eq!(changed.len(), 1);
    assert_eq!(
        from.to_string(),
        "FROM  --platform=linux/amd64   debian:bookworm \\\n  AS   base\n"
    );
}

#[test]
fn test_create_parses_back() {
    let arg = ArgInstruction::create(&[("A", Some("1")), ("B", None)], '\\').unwrap();
    let reparsed = ArgInstruction::parse(&arg.to_string(), '\\').unwrap();
    assert_eq!(reparsed, arg);
    assert_eq!(reparsed.names(), vec!["A", "B"]);

    let flag = KeyValueToken::flag("chown", Some("app:app"), '\\').unwrap();
    assert_eq!(flag.to_string(), "--chown=app:app");
    assert!(flag.is_flag());
}

#[test]
fn test_edit_document_in_place() {
    let mut dockerfile = Dockerfile::parse("FROM alpine AS base\nRUN true\n").unwrap();
    for instruction in dockerfile.instructions_mut() {
        if let Some(from) = instruction.as_from_mut() {
            from.set_image_name("alpine:3.20").unwrap();
            from.set_stage_name(None).unwrap();
        }
    }
    assert_eq!(dockerfile.to_string(), "FROM alpine:3.20\nRUN true\n");

    dockerfile
        .items_mut()
        .push(Construct::Instruction(Instruction::parse("USER app\n", '\\').unwrap()));
    assert_eq!(dockerfile.to_string(), "FROM alpine:3.20\nRUN true\nUSER app\n");
}

#[test]
fn test_removing_the_last_continued_argument_keeps_the_next_line() {
    let mut dockerfile = Dockerfile::parse("ARG A \\\n    B\nRUN x\n").unwrap();
    for instruction in dockerfile.instructions_mut() {
        if let Some(arg) = instruction.as_arg_mut() {
            arg.remove_declaration("B").unwrap();
        }
    }
    let text = dockerfile.to_string();
    assert_eq!(text, "ARG A\nRUN x\n");

    let reparsed = Dockerfile::parse(&text).unwrap();
    let names: Vec<String> = reparsed.instructions().map(Instruction::name).collect();
    assert_eq!(names, vec!["ARG", "RUN"]);
    assert_eq!(reparsed.instructions().next().and_then(Instruction::as_arg).unwrap().names(), vec!["A"]);
}

#[test]
fn test_removing_a_continued_flag() {
    let mut from = FromInstruction::parse("FROM alpine \\\n  AS base\n", '\\').unwrap();
    from.set_platform(Some("linux/amd64")).unwrap();
    assert_eq!(from.to_string(), "FROM --platform=linux/amd64 alpine \\\n  AS base\n");

    let mut from = FromInstruction::parse("FROM \\\n  --platform=linux/amd64 \\\n  alpine\n", '\\').unwrap();
    from.set_platform(None).unwrap();
    assert_eq!(from.to_string(), "FROM \\\n  alpine\n");
    assert_eq!(FromInstruction::parse(&from.to_string(), '\\').unwrap(), from);
}

#[test]
fn test_quotes_inside_words() {
    let text = "FROM alpine\nENV A=x\"y z\"\nARG B=\"x\"y\nLABEL a=b\"c d\" e='f'g\nCOPY \"my file\".txt /dst/\n";
    let dockerfile = Dockerfile::parse(text).unwrap();
    assert_eq!(dockerfile.to_string(), text);

    let instructions: Vec<&Instruction> = dockerfile.instructions().collect();
    assert_eq!(instructions.len(), 5);
    let env = instructions[1].as_env().unwrap();
    assert_eq!(env.variables(), vec![("A".to_string(), "xy z".to_string())]);
    let arg = instructions[2].as_arg().unwrap();
    assert_eq!(arg.declaration("B").unwrap().value().as_deref(), Some("xy"));
}

#[test]
fn test_errors_report_codes() {
    let cases = [
        ("FROM alpine\nRUN echo \"hi\n", None),
        ("FROM ${}\n", Some(ErrorCode::E104)),
        ("FROM ${TAG\n", Some(ErrorCode::E105)),
        ("FORM alpine\n", Some(ErrorCode::E102)),
        ("# escape=!\nFROM a\n", Some(ErrorCode::E106)),
        ("ONBUILD FROM a\n", Some(ErrorCode::E107)),
        ("FROM \"alpine\n", Some(ErrorCode::E103)),
        ("FROM a \"b\n", Some(ErrorCode::E100)),
    ];
    for (text, code) in cases {
        let result = Dockerfile::parse(text);
        match code {
            Some(code) => assert_eq!(result.unwrap_err().code(), code, "{text:?}"),
            None => assert!(result.is_ok(), "{text:?}"),
        }
    }
}
