//! Client side of the message protocol: send a query to a remote gateway and
//! await its reply.

use serde_json::{Map, Value};
use tracing::debug;

use crate::document::QueryInput;
use crate::error::GatewayError;
use crate::schema::QueryResponse;
use crate::transport::{Destination, MessageTransport};
use crate::wire::{WireMessage, GENERIC_MESSAGE_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryApiOptions {
    /// Must match the remote gateway's message key
    pub message_key: String,
    pub destination: Destination,
}

impl QueryApiOptions {
    pub fn with_message_key(mut self, message_key: impl Into<String>) -> Self {
        self.message_key = message_key.into();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }
}

impl Default for QueryApiOptions {
    fn default() -> Self {
        Self {
            message_key: GENERIC_MESSAGE_KEY.to_string(),
            destination: Destination::Internal,
        }
    }
}

/// Send `query` with `variables` over `transport` and return the gateway's
/// response.
///
/// Documents are printed to text before sending. A message no listener
/// answers is reported as [`GatewayError::NoResponse`].
pub async fn query_api(
    transport: &dyn MessageTransport,
    query: impl Into<QueryInput>,
    variables: Map<String, Value>,
    options: &QueryApiOptions,
) -> Result<QueryResponse, GatewayError> {
    let text = query.into().to_text();
    let message = WireMessage::query(options.message_key.clone(), text, variables);
    debug!(
        message_key = %options.message_key,
        destination = ?options.destination,
        "Sending query message"
    );

    match transport.send_message(&options.destination, message).await? {
        Some(reply) => reply,
        None => Err(GatewayError::NoResponse(options.message_key.clone())),
    }
}
