//! Configuration System
//!
//! Layered configuration for the gateway, the devtools hub and logging.
//! Defaults, then the global file, then workspace files, then `FINCH__*`
//! environment variables.

use crate::devtools::DEVTOOLS_PORT_NAME;
use crate::logging::LoggingConfig;
use crate::wire::GENERIC_MESSAGE_KEY;
use serde::{Deserialize, Serialize};

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinchConfig {
    /// Query dispatch settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Devtools observation settings
    #[serde(default)]
    pub devtools: DevtoolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway configuration, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// `type` value that marks a wire message as a query for this gateway
    #[serde(default = "default_message_key")]
    pub message_key: String,

    /// Listen on the same-extension message channel
    #[serde(default)]
    pub attach_messages: bool,

    /// Listen on the cross-extension message channel
    #[serde(default)]
    pub attach_external_messages: bool,
}

fn default_message_key() -> String {
    GENERIC_MESSAGE_KEY.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            message_key: default_message_key(),
            attach_messages: false,
            attach_external_messages: false,
        }
    }
}

/// Devtools configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevtoolsConfig {
    /// Publish executions to devtools ports
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_port_name")]
    pub port_name: String,

    /// Initial recording state of observers
    #[serde(default = "default_true")]
    pub recording: bool,
}

fn default_port_name() -> String {
    DEVTOOLS_PORT_NAME.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DevtoolsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port_name: default_port_name(),
            recording: default_true(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Gateway(String),
    Devtools(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Gateway(msg) => write!(f, "Gateway: {}", msg),
            ValidationError::Devtools(msg) => write!(f, "Devtools: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl FinchConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.gateway.message_key.trim().is_empty() {
            errors.push(ValidationError::Gateway(
                "message_key cannot be empty".to_string(),
            ));
        }

        if self.devtools.port_name.trim().is_empty() {
            errors.push(ValidationError::Devtools(
                "port_name cannot be empty".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
