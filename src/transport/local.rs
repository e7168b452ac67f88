//! In-process transport between extensions.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::MessageSender;
use crate::error::TransportError;
use crate::transport::{Destination, InMemoryChannel, MessageReply, MessageTransport};
use crate::wire::WireMessage;

/// Transport as seen from one extension: its own runtime channel plus the
/// external channels of every extension it can reach.
pub struct LocalTransport {
    extension_id: String,
    internal: Arc<InMemoryChannel>,
    external: RwLock<HashMap<String, Arc<InMemoryChannel>>>,
}

impl LocalTransport {
    pub fn new(extension_id: impl Into<String>, internal: Arc<InMemoryChannel>) -> Self {
        Self {
            extension_id: extension_id.into(),
            internal,
            external: RwLock::new(HashMap::new()),
        }
    }

    /// Make `channel` reachable as the external channel of `extension_id`.
    pub fn register_extension(&self, extension_id: impl Into<String>, channel: Arc<InMemoryChannel>) {
        self.external.write().insert(extension_id.into(), channel);
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    fn sender(&self) -> MessageSender {
        MessageSender::extension(self.extension_id.clone())
    }
}

#[async_trait]
impl MessageTransport for LocalTransport {
    async fn send_message(
        &self,
        destination: &Destination,
        message: WireMessage,
    ) -> Result<Option<MessageReply>, TransportError> {
        let channel = match destination {
            Destination::Internal => self.internal.clone(),
            Destination::External { extension_id } => self
                .external
                .read()
                .get(extension_id)
                .cloned()
                .ok_or_else(|| TransportError::UnknownExtension(extension_id.clone()))?,
        };
        Ok(channel.send(message, Some(self.sender())).await)
    }
}
