//! Devtools observation: the gateway-side hub that publishes `Start` and
//! `Response` events over long-lived ports, and the observer side that folds
//! them into reconciled records.

pub mod connection;
pub mod hub;
pub mod reconciler;

pub use connection::{ConnectionState, PortConnection};
pub use hub::{DevtoolsHub, DevtoolsPort, DEVTOOLS_PORT_NAME, PORT_BUFFER_CAPACITY};
pub use reconciler::{ApplyOutcome, DropReason, ReconciledRecord, ResponseReconciler, SharedReconciler};
