//! Wire message shapes.
//!
//! Query requests carry the configured message key in their `type` field, so
//! they are modelled as an open struct. Devtools traffic uses a closed tagged
//! union on `type`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::schema::QueryError;

/// Message key honored when none is configured.
pub const GENERIC_MESSAGE_KEY: &str = "FINCH_MESSAGE";

/// Query carried by a wire message: plain text, or a serialized document AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireQuery {
    Text(String),
    Document(Value),
}

impl WireQuery {
    pub fn is_empty(&self) -> bool {
        match self {
            WireQuery::Text(text) => text.is_empty(),
            WireQuery::Document(document) => document.is_null(),
        }
    }

    /// Text to execute. A document must carry its source text at
    /// `loc.source.body`.
    pub fn source_text(&self) -> Result<&str, GatewayError> {
        match self {
            WireQuery::Text(text) => Ok(text),
            WireQuery::Document(document) => document
                .pointer("/loc/source/body")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    GatewayError::Parse(
                        "query document carries no source text at loc.source.body".to_string(),
                    )
                }),
        }
    }
}

impl From<&str> for WireQuery {
    fn from(text: &str) -> Self {
        WireQuery::Text(text.to_string())
    }
}

impl From<String> for WireQuery {
    fn from(text: String) -> Self {
        WireQuery::Text(text)
    }
}

/// Serialized unit sent over a message channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<WireQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    /// Fields this crate does not interpret. Never merged into the context.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireMessage {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            query: None,
            variables: None,
            extra: Map::new(),
        }
    }

    pub fn query(
        message_key: impl Into<String>,
        query: impl Into<WireQuery>,
        variables: Map<String, Value>,
    ) -> Self {
        Self {
            message_type: message_key.into(),
            query: Some(query.into()),
            variables: Some(variables),
            extra: Map::new(),
        }
    }

    /// True when this message is a query addressed to `message_key`, in
    /// either text or document form.
    pub fn is_query_for(&self, message_key: &str) -> bool {
        self.message_type == message_key
            && self.query.as_ref().is_some_and(|query| !query.is_empty())
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Announced before a gateway execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl StartPayload {
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
            context: None,
            timestamp: None,
        }
    }
}

/// Announced after a gateway execution completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<QueryError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<u64>,
}

impl ResponsePayload {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: None,
            errors: None,
            time_taken: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Traffic on the long-lived devtools port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevtoolsMessage {
    Start(StartPayload),
    Response(ResponsePayload),
    MessageKey {
        #[serde(rename = "messageKey")]
        message_key: String,
    },
    RequestMessageKey,
}

impl DevtoolsMessage {
    pub fn message_key(message_key: impl Into<String>) -> Self {
        DevtoolsMessage::MessageKey {
            message_key: message_key.into(),
        }
    }

    /// Correlation id, for `Start` and `Response`.
    pub fn id(&self) -> Option<&str> {
        match self {
            DevtoolsMessage::Start(payload) => Some(&payload.id),
            DevtoolsMessage::Response(payload) => Some(&payload.id),
            DevtoolsMessage::MessageKey { .. } | DevtoolsMessage::RequestMessageKey => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DevtoolsMessage::Start(_) => "Start",
            DevtoolsMessage::Response(_) => "Response",
            DevtoolsMessage::MessageKey { .. } => "MessageKey",
            DevtoolsMessage::RequestMessageKey => "RequestMessageKey",
        }
    }

    /// The message as a flat JSON object, `type` included.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }
}
