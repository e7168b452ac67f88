//! Integration tests for Configuration System

use finch::bridge::GatewayChannels;
use finch::config::{ConfigLoader, FinchConfig};
use finch::context::ContextSource;
use finch::error::ApiError;
use finch::schema::Resolvers;
use finch::transport::InMemoryChannel;
use finch::wire::GENERIC_MESSAGE_KEY;
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::with_xdg_env;

fn write(path: &std::path::Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_defaults_without_any_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let config = with_xdg_env(&test_dir, || ConfigLoader::load(workspace.path()).unwrap());

    assert_eq!(config.gateway.message_key, GENERIC_MESSAGE_KEY);
    assert!(!config.gateway.attach_messages);
    assert!(!config.devtools.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_workspace_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &test_dir.path().join("finch").join("config.toml"),
        r#"
[gateway]
message_key = "GLOBAL_KEY"
attach_messages = true

[devtools]
enabled = true
"#,
    );
    write(
        &workspace.path().join("config").join("config.toml"),
        r#"
[gateway]
message_key = "WORKSPACE_KEY"
"#,
    );

    let config = with_xdg_env(&test_dir, || ConfigLoader::load(workspace.path()).unwrap());
    assert_eq!(config.gateway.message_key, "WORKSPACE_KEY");
    assert!(config.gateway.attach_messages, "global setting should survive");
    assert!(config.devtools.enabled);
}

#[test]
fn test_environment_specific_file_and_env_vars() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("staging.toml"),
        r#"
[devtools]
recording = false
"#,
    );

    let config = with_xdg_env(&test_dir, || {
        std::env::set_var("FINCH_ENV", "staging");
        std::env::set_var("FINCH__GATEWAY__MESSAGE_KEY", "FROM_ENV");
        ConfigLoader::load(workspace.path()).unwrap()
    });
    assert!(!config.devtools.recording);
    assert_eq!(config.gateway.message_key, "FROM_ENV");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let test_dir = TempDir::new().unwrap();
    let path = test_dir.path().join("broken.toml");
    write(&path, "[gateway\nmessage_key = ");
    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[tokio::test]
async fn test_loaded_config_drives_gateway_attachment() {
    let test_dir = TempDir::new().unwrap();
    let path = test_dir.path().join("finch.toml");
    write(
        &path,
        r#"
[gateway]
message_key = "APP_QUERY"
attach_messages = true
attach_external_messages = true
"#,
    );
    let config: FinchConfig = ConfigLoader::load_from_file(&path).unwrap();

    let internal = Arc::new(InMemoryChannel::new("runtime"));
    let external = Arc::new(InMemoryChannel::new("external"));
    let channels = GatewayChannels::new()
        .with_internal(internal.clone())
        .with_external(external.clone());
    let api = finch::api::FinchApi::from_config(
        "type Query { ok: Boolean }",
        Resolvers::new().value("Query", "ok", serde_json::json!(true)),
        &config,
        &channels,
    )
    .unwrap();

    assert_eq!(api.gateway().message_key(), "APP_QUERY");
    assert!(api.is_attached(ContextSource::Message));
    assert!(api.is_attached(ContextSource::ExternalMessage));
    assert_eq!(internal.listener_count(), 1);
    assert_eq!(external.listener_count(), 1);
}
