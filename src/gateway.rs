//! Schema gateway: the single entry point for query execution.
//!
//! Direct calls and message-borne queries both go through
//! [`SchemaGateway::query`], which derives the execution context, times the
//! execution and reports it to the observation hook and the devtools hub.

use serde_json::{json, Map, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::GatewayConfig;
use crate::context::{ContextOverrides, ContextProvider, ContextSource, ExecutionContext, MessageSender};
use crate::devtools::DevtoolsHub;
use crate::document::{NormalizedQuery, QueryDocument, QueryInput};
use crate::error::GatewayError;
use crate::schema::{EngineRequest, QueryEngine, QueryResponse};
use crate::transport::MessageReply;
use crate::types::{new_request_id, round_millis};
use crate::wire::WireMessage;

/// Everything known about one completed execution.
#[derive(Debug)]
pub struct QueryEvent<'a> {
    pub query: &'a QueryDocument,
    pub query_text: &'a str,
    pub variables: &'a Map<String, Value>,
    pub context: &'a ExecutionContext,
    /// Whole milliseconds
    pub time_taken: u64,
    pub operation_name: Option<&'a str>,
    pub response: &'a QueryResponse,
}

/// Observation hook run after every execution. Failures are logged and never
/// reach the caller.
pub type QueryResponseHook = Arc<dyn Fn(&QueryEvent<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Construction options beyond the engine itself.
#[derive(Clone, Default)]
pub struct GatewayOptions {
    pub config: GatewayConfig,
    pub context: ContextProvider,
    pub on_query_response: Option<QueryResponseHook>,
}

impl GatewayOptions {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<ContextProvider>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_context_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&ContextOverrides>) -> ExecutionContext + Send + Sync + 'static,
    {
        self.context = ContextProvider::from_fn(f);
        self
    }

    pub fn on_query_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueryEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_query_response = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("on_query_response", &self.on_query_response.is_some())
            .finish()
    }
}

pub struct SchemaGateway {
    engine: Arc<dyn QueryEngine>,
    config: GatewayConfig,
    context: ContextProvider,
    on_query_response: Option<QueryResponseHook>,
    devtools: Option<DevtoolsHub>,
}

impl SchemaGateway {
    pub fn new(engine: Arc<dyn QueryEngine>, options: GatewayOptions) -> Self {
        let GatewayOptions {
            config,
            context,
            on_query_response,
        } = options;
        Self {
            engine,
            config,
            context,
            on_query_response,
            devtools: None,
        }
    }

    /// Publish every execution to `hub`.
    pub fn with_devtools(mut self, hub: DevtoolsHub) -> Self {
        self.devtools = Some(hub);
        self
    }

    pub fn message_key(&self) -> &str {
        &self.config.message_key
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn devtools(&self) -> Option<&DevtoolsHub> {
        self.devtools.as_ref()
    }

    /// Execute a query given as text or as a parsed document.
    ///
    /// Parse failures and engine failures are errors; execution errors are
    /// returned in the response.
    pub async fn query(
        &self,
        input: impl Into<QueryInput>,
        variables: Option<Map<String, Value>>,
        base_context: Option<ContextOverrides>,
    ) -> Result<QueryResponse, GatewayError> {
        let NormalizedQuery {
            document,
            text,
            operation_name,
        } = NormalizedQuery::from_input(input.into())?;
        let context = self.context.derive(base_context.as_ref());
        let variables = variables.unwrap_or_default();

        let request_id = self.devtools.as_ref().map(|hub| {
            let id = new_request_id();
            hub.publish_start(&id, &text, &variables, operation_name.as_deref(), &context);
            id
        });

        let started = Instant::now();
        let response = self
            .engine
            .execute(EngineRequest {
                query: text.clone(),
                variables: variables.clone(),
                context: context.clone(),
                operation_name: operation_name.clone(),
                root_value: json!({ "root": true }),
            })
            .await?;
        let time_taken = round_millis(started.elapsed());

        debug!(
            operation = operation_name.as_deref().unwrap_or("<anonymous>"),
            source = context.source.as_str(),
            time_taken_ms = time_taken,
            errors = response.errors.as_ref().map_or(0, Vec::len),
            "Query executed"
        );

        self.observe(&QueryEvent {
            query: &document,
            query_text: &text,
            variables: &variables,
            context: &context,
            time_taken,
            operation_name: operation_name.as_deref(),
            response: &response,
        });

        if let (Some(hub), Some(id)) = (self.devtools.as_ref(), request_id) {
            hub.publish_response(&id, &response, time_taken);
        }

        Ok(response)
    }

    fn observe(&self, event: &QueryEvent<'_>) {
        let Some(hook) = self.on_query_response.as_ref() else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| hook(event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(error = %err, "Query response hook failed");
            }
            Err(_) => {
                warn!("Query response hook panicked");
            }
        }
    }

    /// Handle a message from the same-extension channel.
    pub async fn on_message(
        &self,
        message: WireMessage,
        sender: Option<MessageSender>,
    ) -> Option<MessageReply> {
        self.handle_message(message, sender, ContextSource::Message)
            .await
    }

    /// Handle a message from the cross-extension channel.
    pub async fn on_external_message(
        &self,
        message: WireMessage,
        sender: Option<MessageSender>,
    ) -> Option<MessageReply> {
        self.handle_message(message, sender, ContextSource::ExternalMessage)
            .await
    }

    /// Run `message` as a query tagged with `source`, or return `None` when it
    /// is not a query for this gateway's message key.
    pub async fn handle_message(
        &self,
        message: WireMessage,
        sender: Option<MessageSender>,
        source: ContextSource,
    ) -> Option<MessageReply> {
        if !message.is_query_for(&self.config.message_key) {
            trace!(
                message_type = %message.message_type,
                source = source.as_str(),
                "Ignoring message not addressed to the gateway"
            );
            return None;
        }
        let WireMessage {
            query, variables, ..
        } = message;
        let query = match query?.source_text() {
            Ok(text) => text.to_string(),
            Err(err) => {
                warn!(source = source.as_str(), error = %err, "Rejecting query message");
                return Some(Err(err));
            }
        };
        Some(
            self.query(
                query,
                Some(variables.unwrap_or_default()),
                Some(ContextOverrides::from_message(source, sender)),
            )
            .await,
        )
    }
}

impl fmt::Debug for SchemaGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaGateway")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("devtools", &self.devtools.is_some())
            .finish_non_exhaustive()
    }
}
