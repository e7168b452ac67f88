//! Observer-side driver for a devtools port.

use tokio::sync::watch;
use tracing::{info, trace, warn};

use crate::devtools::hub::DevtoolsPort;
use crate::devtools::reconciler::SharedReconciler;
use crate::wire::DevtoolsMessage;

/// Connection lifecycle as seen by the observer UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No port has been opened yet
    NotConnected,
    Connected,
    /// A port was open and has been severed
    Disconnected,
}

/// Feeds a port's traffic into a [`SharedReconciler`] and reports the
/// connection state.
pub struct PortConnection {
    reconciler: SharedReconciler,
    state: watch::Sender<ConnectionState>,
}

impl PortConnection {
    pub fn new(reconciler: SharedReconciler) -> (Self, watch::Receiver<ConnectionState>) {
        let (state, receiver) = watch::channel(ConnectionState::NotConnected);
        (Self { reconciler, state }, receiver)
    }

    pub fn reconciler(&self) -> &SharedReconciler {
        &self.reconciler
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Drive `port` until it closes.
    ///
    /// The current message key is requested as soon as the port is up, so a
    /// fresh observer configures itself. Can be called again with a new port
    /// after a disconnection.
    pub async fn run(&self, mut port: DevtoolsPort) -> ConnectionState {
        if let Err(err) = port.post_message(DevtoolsMessage::RequestMessageKey) {
            warn!(error = %err, "Devtools port closed before the message key request");
            self.state.send_replace(ConnectionState::Disconnected);
            return ConnectionState::Disconnected;
        }
        self.state.send_replace(ConnectionState::Connected);
        info!(port_id = port.id(), "Devtools observer connected");

        while let Some(message) = port.recv().await {
            let kind = message.kind();
            let outcome = self.reconciler.apply(message);
            trace!(kind, ?outcome, "Applied devtools message");
        }

        self.state.send_replace(ConnectionState::Disconnected);
        info!(port_id = port.id(), "Devtools observer disconnected");
        ConnectionState::Disconnected
    }
}
