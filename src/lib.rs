//! Finch: Cross-Context GraphQL Gateway
//!
//! Runs GraphQL queries in one execution context on behalf of callers in
//! other contexts. Callers either invoke the gateway directly or send it a
//! keyed message over a message channel. Every execution can be observed
//! through a hook and mirrored to devtools ports.

pub mod api;
pub mod bridge;
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod devtools;
pub mod document;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod schema;
pub mod transport;
pub mod types;
pub mod wire;
