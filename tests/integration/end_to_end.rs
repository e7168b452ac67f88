//! End-to-end: a client in one context querying a gateway in another

use finch::api::FinchApi;
use finch::bridge::GatewayChannels;
use finch::client::{query_api, QueryApiOptions};
use finch::config::{DevtoolsConfig, GatewayConfig};
use finch::context::{ContextOverrides, ContextSource, ExecutionContext};
use finch::error::{GatewayError, TransportError};
use finch::gateway::GatewayOptions;
use finch::schema::{ResolverArgs, Resolvers};
use finch::transport::{Destination, InMemoryChannel, LocalTransport};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const SCHEMA: &str = r#"
type Query {
  whoami: Caller!
  user(id: ID!): User
}

type Caller {
  source: String!
  senderId: String
  tenant: String
}

type User {
  id: ID!
  name: String!
  role: Role!
}

enum Role {
  ADMIN
  MEMBER
}
"#;

struct Harness {
    api: FinchApi,
    /// Transport of the gateway's own extension
    own: LocalTransport,
    /// Transport of another extension that can reach the gateway
    foreign: LocalTransport,
    events: Arc<Mutex<Vec<(ContextSource, u64, Option<String>)>>>,
}

fn resolvers() -> Resolvers {
    Resolvers::new()
        .field("Query", "whoami", |args: ResolverArgs| async move {
            let context = args.context;
            Ok(json!({
                "source": context.source.as_str(),
                "senderId": context.sender.and_then(|s| s.id),
                "tenant": context.fields.get("tenant").cloned(),
            }))
        })
        .field("Query", "user", |args: ResolverArgs| async move {
            let id = args.args.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            if id == "missing" {
                return Ok(Value::Null);
            }
            Ok(json!({ "id": id, "name": format!("user-{id}"), "role": "ADMIN" }))
        })
}

fn harness(message_key: &str) -> Harness {
    let internal = Arc::new(InMemoryChannel::new("runtime"));
    let external = Arc::new(InMemoryChannel::new("external"));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let config = GatewayConfig {
        message_key: message_key.to_string(),
        attach_messages: true,
        attach_external_messages: true,
    };
    let options = GatewayOptions::new(config)
        .with_context(ExecutionContext::default().with_field("tenant", json!("acme")))
        .on_query_response(move |event| {
            sink.lock().push((
                event.context.source,
                event.time_taken,
                event.operation_name.map(str::to_string),
            ));
            Ok(())
        });
    let api = FinchApi::new(
        SCHEMA,
        resolvers(),
        options,
        &DevtoolsConfig::default(),
        &GatewayChannels::new()
            .with_internal(internal.clone())
            .with_external(external.clone()),
    )
    .unwrap();

    let own = LocalTransport::new("gateway-ext", internal);
    let foreign = LocalTransport::new("caller-ext", Arc::new(InMemoryChannel::new("caller-runtime")));
    foreign.register_extension("gateway-ext", external);

    Harness {
        api,
        own,
        foreign,
        events,
    }
}

#[tokio::test]
async fn test_internal_message_query() {
    let h = harness("E2E");
    let options = QueryApiOptions::default().with_message_key("E2E");
    let response = query_api(&h.own, "{ whoami { source senderId tenant } }", Map::new(), &options)
        .await
        .unwrap();
    assert_eq!(
        response.data,
        Some(json!({
            "whoami": { "source": "Message", "senderId": "gateway-ext", "tenant": "acme" }
        }))
    );
    assert_eq!(h.events.lock()[0].0, ContextSource::Message);
}

#[tokio::test]
async fn test_external_message_query_with_variables() {
    let h = harness("E2E");
    let options = QueryApiOptions::default()
        .with_message_key("E2E")
        .with_destination(Destination::external("gateway-ext"));
    let mut variables = Map::new();
    variables.insert("id".to_string(), json!("7"));

    let response = query_api(
        &h.foreign,
        "query GetUser($id: ID!) { user(id: $id) { id name role } whoami { source senderId } }",
        variables,
        &options,
    )
    .await
    .unwrap();

    assert_eq!(
        response.data,
        Some(json!({
            "user": { "id": "7", "name": "user-7", "role": "ADMIN" },
            "whoami": { "source": "ExternalMessage", "senderId": "caller-ext" }
        }))
    );
    let events = h.events.lock();
    assert_eq!(events[0].0, ContextSource::ExternalMessage);
    assert_eq!(events[0].2.as_deref(), Some("GetUser"));
}

#[tokio::test]
async fn test_direct_query_is_internal_and_overridable() {
    let h = harness("E2E");
    let response = h
        .api
        .query("{ whoami { source tenant } }", None, None)
        .await
        .unwrap();
    assert_eq!(
        response.data,
        Some(json!({ "whoami": { "source": "Internal", "tenant": "acme" } }))
    );

    let overrides = ContextOverrides::default().with_field("tenant", json!("globex"));
    let response = h
        .api
        .query("{ whoami { tenant } }", None, Some(overrides))
        .await
        .unwrap();
    assert_eq!(response.data, Some(json!({ "whoami": { "tenant": "globex" } })));
}

#[tokio::test]
async fn test_execution_errors_travel_in_response() {
    let h = harness("E2E");
    let response = query_api(
        &h.own,
        "{ nope }",
        Map::new(),
        &QueryApiOptions::default().with_message_key("E2E"),
    )
    .await
    .unwrap();
    assert!(response.has_errors());
    assert_eq!(h.events.lock().len(), 1, "hook runs for execution errors too");
}

#[tokio::test]
async fn test_nullable_field_resolves_null() {
    let h = harness("E2E");
    let response = h
        .api
        .query("{ user(id: \"missing\") { id } }", None, None)
        .await
        .unwrap();
    assert_eq!(response.data, Some(json!({ "user": null })));
    assert!(!response.has_errors());
}

#[tokio::test]
async fn test_wrong_message_key_gets_no_response() {
    let h = harness("E2E");
    let err = query_api(&h.own, "{ whoami { source } }", Map::new(), &QueryApiOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NoResponse(_)));
    assert!(h.events.lock().is_empty());
}

#[tokio::test]
async fn test_unreachable_extension() {
    let h = harness("E2E");
    let options = QueryApiOptions::default()
        .with_message_key("E2E")
        .with_destination(Destination::external("unknown-ext"));
    let err = query_api(&h.foreign, "{ whoami { source } }", Map::new(), &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Transport(TransportError::UnknownExtension(_))
    ));
}

#[tokio::test]
async fn test_detached_gateway_stops_answering_messages() {
    let mut h = harness("E2E");
    h.api.detach();
    let err = query_api(
        &h.own,
        "{ whoami { source } }",
        Map::new(),
        &QueryApiOptions::default().with_message_key("E2E"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GatewayError::NoResponse(_)));
    assert!(h.api.query("{ whoami { source } }", None, None).await.is_ok());
}
