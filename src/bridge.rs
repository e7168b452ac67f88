//! Attaches a gateway to the message channels its configuration enables.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::{ContextSource, MessageSender};
use crate::error::ApiError;
use crate::gateway::SchemaGateway;
use crate::transport::{ListenerId, MessageChannel, MessageHandler, MessageReply};
use crate::wire::WireMessage;

/// Channels a gateway may listen on.
#[derive(Clone, Default)]
pub struct GatewayChannels {
    /// Same-extension channel
    pub internal: Option<Arc<dyn MessageChannel>>,
    /// Cross-extension channel
    pub external: Option<Arc<dyn MessageChannel>>,
}

impl GatewayChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_internal(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.internal = Some(channel);
        self
    }

    pub fn with_external(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.external = Some(channel);
        self
    }
}

impl std::fmt::Debug for GatewayChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayChannels")
            .field("internal", &self.internal.is_some())
            .field("external", &self.external.is_some())
            .finish()
    }
}

/// Channel listener forwarding to the gateway with a fixed provenance.
struct SourceHandler {
    gateway: Arc<SchemaGateway>,
    source: ContextSource,
}

#[async_trait]
impl MessageHandler for SourceHandler {
    async fn on_message(
        &self,
        message: WireMessage,
        sender: Option<MessageSender>,
    ) -> Option<MessageReply> {
        self.gateway
            .handle_message(message, sender, self.source)
            .await
    }
}

/// Listener for `gateway` that tags every query with `source`.
pub fn message_handler(gateway: Arc<SchemaGateway>, source: ContextSource) -> Arc<dyn MessageHandler> {
    Arc::new(SourceHandler { gateway, source })
}

struct Attachment {
    channel: Arc<dyn MessageChannel>,
    listener: ListenerId,
    source: ContextSource,
}

/// Live listener registrations. Dropping the bridge detaches them.
pub struct MessageBridge {
    attachments: Vec<Attachment>,
}

impl MessageBridge {
    /// Register listeners per the gateway's `attach_messages` and
    /// `attach_external_messages` flags. A flag set without a matching
    /// channel is a configuration error and nothing is attached.
    pub fn attach(gateway: Arc<SchemaGateway>, channels: &GatewayChannels) -> Result<Self, ApiError> {
        let config = gateway.config().clone();
        let mut wanted = Vec::new();
        if config.attach_messages {
            let channel = channels.internal.clone().ok_or_else(|| {
                ApiError::ConfigError(
                    "attach_messages is set but no internal channel was supplied".to_string(),
                )
            })?;
            wanted.push((channel, ContextSource::Message));
        }
        if config.attach_external_messages {
            let channel = channels.external.clone().ok_or_else(|| {
                ApiError::ConfigError(
                    "attach_external_messages is set but no external channel was supplied"
                        .to_string(),
                )
            })?;
            wanted.push((channel, ContextSource::ExternalMessage));
        }

        let attachments = wanted
            .into_iter()
            .map(|(channel, source)| {
                let listener = channel.add_listener(message_handler(gateway.clone(), source));
                info!(
                    source = source.as_str(),
                    message_key = %config.message_key,
                    "Gateway attached to message channel"
                );
                Attachment {
                    channel,
                    listener,
                    source,
                }
            })
            .collect();
        Ok(Self { attachments })
    }

    pub fn is_attached(&self, source: ContextSource) -> bool {
        self.attachments.iter().any(|a| a.source == source)
    }

    /// Remove every listener this bridge registered.
    pub fn detach(&mut self) {
        for attachment in self.attachments.drain(..) {
            let removed = attachment.channel.remove_listener(attachment.listener);
            debug!(
                source = attachment.source.as_str(),
                removed, "Gateway detached from message channel"
            );
        }
    }
}

impl Drop for MessageBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for MessageBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.attachments.iter().map(|a| a.source.as_str()).collect();
        f.debug_struct("MessageBridge").field("sources", &sources).finish()
    }
}
