//! In-process message channel.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::context::MessageSender;
use crate::transport::{ListenerId, MessageChannel, MessageHandler, MessageReply};
use crate::wire::WireMessage;

/// Channel delivering each message to its listeners in registration order.
/// The first listener that answers supplies the reply.
pub struct InMemoryChannel {
    name: String,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn MessageHandler>)>>,
    next_id: AtomicU64,
}

impl InMemoryChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub async fn send(
        &self,
        message: WireMessage,
        sender: Option<MessageSender>,
    ) -> Option<MessageReply> {
        let listeners: Vec<Arc<dyn MessageHandler>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        trace!(
            channel = %self.name,
            message_type = %message.message_type,
            listeners = listeners.len(),
            "Delivering message"
        );
        for handler in listeners {
            if let Some(reply) = handler.on_message(message.clone(), sender.clone()).await {
                return Some(reply);
            }
        }
        None
    }
}

impl MessageChannel for InMemoryChannel {
    fn add_listener(&self, handler: Arc<dyn MessageHandler>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, handler));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}
