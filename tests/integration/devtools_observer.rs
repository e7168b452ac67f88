//! Integration tests for gateway activity mirrored to a devtools observer

use finch::api::FinchApi;
use finch::bridge::GatewayChannels;
use finch::config::{DevtoolsConfig, GatewayConfig};
use finch::devtools::{ConnectionState, PortConnection, ResponseReconciler, SharedReconciler, DEVTOOLS_PORT_NAME};
use finch::gateway::GatewayOptions;
use finch::schema::{ResolverArgs, ResolverError, Resolvers};
use serde_json::{json, Map, Value};

fn api(message_key: &str) -> FinchApi {
    api_with(
        message_key,
        DevtoolsConfig {
            enabled: true,
            ..DevtoolsConfig::default()
        },
    )
}

fn api_with(message_key: &str, devtools: DevtoolsConfig) -> FinchApi {
    let resolvers = Resolvers::new()
        .field("Query", "echo", |args: ResolverArgs| async move {
            Ok(args.args.get("text").cloned().unwrap_or(Value::Null))
        })
        .field("Query", "broken", |_args: ResolverArgs| async move {
            Err::<Value, _>(ResolverError::new("resolver failed"))
        });
    let config = GatewayConfig {
        message_key: message_key.to_string(),
        ..GatewayConfig::default()
    };
    FinchApi::new(
        "type Query { echo(text: String): String, broken: String }",
        resolvers,
        GatewayOptions::new(config),
        &devtools,
        &GatewayChannels::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_observer_reconciles_executions() {
    let api = api("OBSERVED_KEY");
    let hub = api.devtools().unwrap().clone();
    let port = hub.connect(DEVTOOLS_PORT_NAME).unwrap();

    let mut variables = Map::new();
    variables.insert("text".to_string(), json!("hello"));
    api.query(
        "query Echo($text: String) { echo(text: $text) }",
        Some(variables),
        None,
    )
    .await
    .unwrap();
    let failed = api.query("{ broken }", None, None).await.unwrap();
    assert!(failed.has_errors());

    let (connection, mut state) = PortConnection::new(SharedReconciler::default());
    let driver = async {
        state.changed().await.unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Connected);
        hub.disconnect_all();
    };
    let (final_state, ()) = tokio::join!(connection.run(port), driver);
    assert_eq!(final_state, ConnectionState::Disconnected);

    let reconciler = connection.reconciler();
    assert_eq!(reconciler.message_key().as_deref(), Some("OBSERVED_KEY"));

    let records = reconciler.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_resolved()));

    assert_eq!(records[0].get("operationName"), Some(&json!("Echo")));
    assert_eq!(records[0].get("data"), Some(&json!({ "echo": "hello" })));
    assert_eq!(records[0].get("variables"), Some(&json!({ "text": "hello" })));
    assert_eq!(
        records[0].get("context").and_then(|c| c.get("source")),
        Some(&json!("Internal"))
    );
    assert!(records[0].get("timeTaken").is_some());

    let errors = records[1].get("errors").and_then(Value::as_array).unwrap();
    assert_eq!(errors[0]["message"], json!("resolver failed"));
}

#[tokio::test]
async fn test_paused_observer_keeps_message_key_only() {
    let api = api("PAUSED_KEY");
    let hub = api.devtools().unwrap().clone();
    let port = hub.connect(DEVTOOLS_PORT_NAME).unwrap();

    api.query("{ echo(text: \"x\") }", None, None).await.unwrap();

    let reconciler = SharedReconciler::new(ResponseReconciler::new(false));
    let (connection, mut state) = PortConnection::new(reconciler.clone());
    let driver = async {
        state.changed().await.unwrap();
        hub.disconnect_all();
    };
    tokio::join!(connection.run(port), driver);

    assert!(reconciler.records().is_empty());
    assert_eq!(reconciler.message_key().as_deref(), Some("PAUSED_KEY"));
}

#[tokio::test]
async fn test_configured_paused_observer_records_nothing() {
    let api = api_with(
        "CONFIGURED_KEY",
        DevtoolsConfig {
            enabled: true,
            recording: false,
            ..DevtoolsConfig::default()
        },
    );
    let (connection, port) = api.observe().unwrap();
    api.query("{ echo(text: \"x\") }", None, None).await.unwrap();

    let hub = api.devtools().unwrap().clone();
    let mut state = connection.subscribe();
    let driver = async {
        state.changed().await.unwrap();
        hub.disconnect_all();
    };
    tokio::join!(connection.run(port), driver);

    let reconciler = connection.reconciler();
    assert!(!reconciler.is_recording());
    assert!(reconciler.records().is_empty());
    assert_eq!(reconciler.message_key().as_deref(), Some("CONFIGURED_KEY"));
}

#[tokio::test]
async fn test_no_ports_means_nothing_buffered() {
    let api = api("KEY");
    api.query("{ echo(text: \"before\") }", None, None).await.unwrap();

    let hub = api.devtools().unwrap();
    assert_eq!(hub.port_count(), 0);
    let mut port = hub.connect(DEVTOOLS_PORT_NAME).unwrap();
    api.query("{ echo(text: \"after\") }", None, None).await.unwrap();

    let start = port.recv().await.unwrap();
    assert_eq!(start.kind(), "Start");
    assert_eq!(
        start.to_fields().get("query"),
        Some(&json!("{ echo(text: \"after\") }"))
    );
}
