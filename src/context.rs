//! Execution context derivation.
//!
//! Every execution receives an [`ExecutionContext`] whose `source` records the
//! provenance of the call. The gateway is configured with a [`ContextProvider`]
//! that is either a constant seed or a function of the per-call overrides.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Keys owned by [`ExecutionContext`] itself; extra fields may not use them.
pub const RESERVED_CONTEXT_KEYS: [&str; 2] = ["source", "sender"];

fn is_reserved_key(key: &str) -> bool {
    RESERVED_CONTEXT_KEYS.contains(&key)
}

/// Insert an extra field unless `key` is reserved.
fn insert_field(fields: &mut Map<String, Value>, key: String, value: Value) {
    if is_reserved_key(&key) {
        warn!(key = %key, "Ignoring reserved context key");
        return;
    }
    fields.insert(key, value);
}

/// Provenance of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextSource {
    /// Direct in-process call
    Internal,
    /// Same-extension message channel
    Message,
    /// Cross-extension message channel
    ExternalMessage,
}

impl ContextSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextSource::Internal => "Internal",
            ContextSource::Message => "Message",
            ContextSource::ExternalMessage => "ExternalMessage",
        }
    }
}

/// Opaque descriptor of the party that sent a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
}

impl MessageSender {
    pub fn extension(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Context handed to resolvers for one execution.
///
/// Serializes as one flat object. Extra fields named `source` or `sender` are
/// never emitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionContext {
    pub source: ContextSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<MessageSender>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(source: ContextSource) -> Self {
        Self {
            source,
            sender: None,
            fields: Map::new(),
        }
    }

    /// Add an extra field. Reserved keys are ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        insert_field(&mut self.fields, key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True when the call crossed the extension boundary.
    pub fn is_external(&self) -> bool {
        self.source == ContextSource::ExternalMessage
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for ExecutionContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("source", &self.source)?;
        if let Some(sender) = &self.sender {
            map.serialize_entry("sender", sender)?;
        }
        for (key, value) in self.fields.iter().filter(|(key, _)| !is_reserved_key(key)) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(ContextSource::Internal)
    }
}

/// Per-call values layered over the configured context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextOverrides {
    pub source: Option<ContextSource>,
    pub sender: Option<MessageSender>,
    pub fields: Map<String, Value>,
}

impl ContextOverrides {
    /// Overrides for a query that arrived over a message channel.
    pub fn from_message(source: ContextSource, sender: Option<MessageSender>) -> Self {
        Self {
            source: Some(source),
            sender,
            fields: Map::new(),
        }
    }

    /// Add an extra field. Reserved keys are ignored; use `source` and
    /// `sender` directly.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        insert_field(&mut self.fields, key.into(), value);
        self
    }
}

pub type ContextFn = Arc<dyn Fn(Option<&ContextOverrides>) -> ExecutionContext + Send + Sync>;

/// Configured base context: a constant seed or a function of the overrides.
#[derive(Clone)]
pub enum ContextProvider {
    Static(ExecutionContext),
    Dynamic(ContextFn),
}

impl ContextProvider {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Option<&ContextOverrides>) -> ExecutionContext + Send + Sync + 'static,
    {
        ContextProvider::Dynamic(Arc::new(f))
    }

    /// Produce the context for one execution.
    ///
    /// A static seed is copied and the overrides are laid over it, overrides
    /// winning on collision. A dynamic provider's return value is used as is.
    pub fn derive(&self, overrides: Option<&ContextOverrides>) -> ExecutionContext {
        match self {
            ContextProvider::Dynamic(f) => f(overrides),
            ContextProvider::Static(seed) => {
                let mut context = seed.clone();
                if let Some(overrides) = overrides {
                    if let Some(source) = overrides.source {
                        context.source = source;
                    }
                    if overrides.source.is_some() || overrides.sender.is_some() {
                        context.sender = overrides.sender.clone();
                    }
                    for (key, value) in &overrides.fields {
                        insert_field(&mut context.fields, key.clone(), value.clone());
                    }
                }
                context
            }
        }
    }
}

impl Default for ContextProvider {
    fn default() -> Self {
        ContextProvider::Static(ExecutionContext::default())
    }
}

impl From<ExecutionContext> for ContextProvider {
    fn from(seed: ExecutionContext) -> Self {
        ContextProvider::Static(seed)
    }
}

impl fmt::Debug for ContextProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextProvider::Static(seed) => f.debug_tuple("Static").field(seed).finish(),
            ContextProvider::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}
