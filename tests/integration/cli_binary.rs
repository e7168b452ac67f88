//! Integration tests for the finch binary.

use serde_json::{json, Value};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("schema.graphql"),
        "type Query { hello(name: String): String, version: Int }",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("data.json"),
        r#"{ "hello": "hi there", "version": 4 }"#,
    )
    .unwrap();
    temp_dir
}

fn finch(workspace: &TempDir, args: &[&str]) -> std::process::Output {
    let home = workspace.path().join("home");
    fs::create_dir_all(&home).unwrap();
    Command::new(env!("CARGO_BIN_EXE_finch"))
        .arg("--workspace")
        .arg(workspace.path())
        .arg("--quiet")
        .args(args)
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", workspace.path().join("xdg"))
        .env_remove("FINCH_LOG")
        .output()
        .expect("failed to run finch binary")
}

#[test]
fn test_query_prints_response_json() {
    let ws = workspace();
    let output = finch(
        &ws,
        &["query", "--schema", "schema.graphql", "--data", "data.json", "{ hello version }"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, json!({ "data": { "hello": "hi there", "version": 4 } }));
}

#[test]
fn test_query_via_message_channel() {
    let ws = workspace();
    let output = finch(
        &ws,
        &[
            "query",
            "--schema",
            "schema.graphql",
            "--data",
            "data.json",
            "--via-message",
            "{ version }",
        ],
    );
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, json!({ "data": { "version": 4 } }));
}

#[test]
fn test_invalid_schema_fails() {
    let ws = workspace();
    fs::write(ws.path().join("bad.graphql"), "type Query {").unwrap();
    let output = finch(&ws, &["sdl", "--schema", "bad.graphql"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Schema error"));
}

#[test]
fn test_sdl_prints_schema() {
    let ws = workspace();
    let output = finch(&ws, &["sdl", "--schema", "schema.graphql"]);
    assert!(output.status.success());
    let sdl = String::from_utf8_lossy(&output.stdout);
    assert!(sdl.contains("hello"));
    assert!(sdl.contains("version: Int"));
}
