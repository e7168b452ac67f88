//! Gateway-side devtools hub.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::context::ExecutionContext;
use crate::error::TransportError;
use crate::schema::QueryResponse;
use crate::types::now_rfc3339;
use crate::wire::{DevtoolsMessage, ResponsePayload, StartPayload};

/// Default name of the devtools port.
pub const DEVTOOLS_PORT_NAME: &str = "finch-devtools";

/// Messages buffered per port before further messages to it are dropped.
pub const PORT_BUFFER_CAPACITY: usize = 256;

struct PortSlot {
    id: u64,
    outbound: Sender<DevtoolsMessage>,
}

struct HubShared {
    port_name: String,
    message_key: String,
    ports: Mutex<Vec<PortSlot>>,
    next_port: AtomicU64,
    capacity: usize,
}

impl HubShared {
    fn send_to(&self, port_id: u64, message: DevtoolsMessage) -> Result<(), TransportError> {
        let ports = self.ports.lock();
        let slot = ports
            .iter()
            .find(|slot| slot.id == port_id)
            .ok_or(TransportError::PortClosed)?;
        match slot.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                warn!(port_id, kind = message.kind(), "Devtools port buffer full; dropping message");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::PortClosed),
        }
    }
}

/// Broadcasts gateway activity to every connected observer port and answers
/// their `RequestMessageKey` messages.
#[derive(Clone)]
pub struct DevtoolsHub {
    shared: Arc<HubShared>,
}

impl DevtoolsHub {
    pub fn new(port_name: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::with_capacity(port_name, message_key, PORT_BUFFER_CAPACITY)
    }

    /// Hub whose ports each buffer at most `capacity` undelivered messages.
    /// A port that falls behind misses messages; it is not disconnected.
    pub fn with_capacity(
        port_name: impl Into<String>,
        message_key: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            shared: Arc::new(HubShared {
                port_name: port_name.into(),
                message_key: message_key.into(),
                ports: Mutex::new(Vec::new()),
                next_port: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.shared.port_name
    }

    pub fn message_key(&self) -> &str {
        &self.shared.message_key
    }

    /// Open a long-lived port. The name must match the hub's port name.
    pub fn connect(&self, port_name: &str) -> Result<DevtoolsPort, TransportError> {
        if port_name != self.shared.port_name {
            return Err(TransportError::UnknownPort(port_name.to_string()));
        }
        let (outbound, inbound) = channel(self.shared.capacity);
        let id = self.shared.next_port.fetch_add(1, Ordering::Relaxed);
        self.shared.ports.lock().push(PortSlot { id, outbound });
        debug!(port_id = id, port_name = %port_name, "Devtools port connected");
        Ok(DevtoolsPort {
            id,
            shared: Arc::downgrade(&self.shared),
            inbound,
        })
    }

    /// Send `message` to every open port, pruning closed ones. Ports whose
    /// buffer is full skip this message.
    /// Returns the number of ports reached.
    pub fn publish(&self, message: DevtoolsMessage) -> usize {
        let mut ports = self.shared.ports.lock();
        let mut reached = 0;
        ports.retain(|slot| match slot.outbound.try_send(message.clone()) {
            Ok(()) => {
                reached += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(port_id = slot.id, kind = message.kind(), "Devtools port buffer full; dropping message");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        trace!(kind = message.kind(), ports = ports.len(), reached, "Published devtools message");
        reached
    }

    pub fn publish_start(
        &self,
        id: &str,
        query: &str,
        variables: &Map<String, Value>,
        operation_name: Option<&str>,
        context: &ExecutionContext,
    ) -> usize {
        self.publish(DevtoolsMessage::Start(StartPayload {
            id: id.to_string(),
            query: query.to_string(),
            variables: variables.clone(),
            operation_name: operation_name.map(str::to_string),
            context: Some(context.to_value()),
            timestamp: Some(now_rfc3339()),
        }))
    }

    pub fn publish_response(&self, id: &str, response: &QueryResponse, time_taken: u64) -> usize {
        self.publish(DevtoolsMessage::Response(ResponsePayload {
            id: id.to_string(),
            data: response.data.clone(),
            errors: response.errors.clone(),
            time_taken: Some(time_taken),
        }))
    }

    pub fn port_count(&self) -> usize {
        self.shared.ports.lock().len()
    }

    /// Close every port; observers see the disconnection.
    pub fn disconnect_all(&self) {
        let closed = {
            let mut ports = self.shared.ports.lock();
            let count = ports.len();
            ports.clear();
            count
        };
        debug!(ports = closed, "Devtools ports disconnected");
    }
}

/// Observer end of a devtools port.
pub struct DevtoolsPort {
    id: u64,
    shared: Weak<HubShared>,
    inbound: Receiver<DevtoolsMessage>,
}

impl DevtoolsPort {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Send a message to the gateway side.
    pub fn post_message(&self, message: DevtoolsMessage) -> Result<(), TransportError> {
        let shared = self.shared.upgrade().ok_or(TransportError::PortClosed)?;
        match message {
            DevtoolsMessage::RequestMessageKey => {
                let reply = DevtoolsMessage::message_key(shared.message_key.clone());
                shared.send_to(self.id, reply)
            }
            other => {
                debug!(kind = other.kind(), "Ignoring unexpected observer message");
                Ok(())
            }
        }
    }

    /// Next message from the gateway; `None` once the port is closed.
    pub async fn recv(&mut self) -> Option<DevtoolsMessage> {
        self.inbound.recv().await
    }
}

impl Drop for DevtoolsPort {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.ports.lock().retain(|slot| slot.id != self.id);
        }
    }
}
