//! Message-passing transport seams.
//!
//! The gateway only depends on the [`MessageChannel`] and [`MessageTransport`]
//! traits. The in-process implementations here back the tests and the CLI.

mod channel;
mod local;

use async_trait::async_trait;

use crate::context::MessageSender;
use crate::error::{GatewayError, TransportError};
use crate::schema::QueryResponse;
use crate::wire::WireMessage;

pub use channel::InMemoryChannel;
pub use local::LocalTransport;

/// Reply produced by a listener that handled a message.
pub type MessageReply = Result<QueryResponse, GatewayError>;

pub type ListenerId = u64;

/// Listener attached to a message channel.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// `None` means the message was not for this listener.
    async fn on_message(
        &self,
        message: WireMessage,
        sender: Option<MessageSender>,
    ) -> Option<MessageReply>;
}

/// Listener registration capability of a channel.
pub trait MessageChannel: Send + Sync {
    fn add_listener(&self, handler: std::sync::Arc<dyn MessageHandler>) -> ListenerId;

    /// Returns false when `id` was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Where a client message is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The sender's own extension
    Internal,
    /// Another extension, by id
    External { extension_id: String },
}

impl Destination {
    pub fn external(extension_id: impl Into<String>) -> Self {
        Destination::External {
            extension_id: extension_id.into(),
        }
    }
}

/// Send capability used by clients.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_message(
        &self,
        destination: &Destination,
        message: WireMessage,
    ) -> Result<Option<MessageReply>, TransportError>;
}
