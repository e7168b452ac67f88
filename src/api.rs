//! Finch API
//!
//! Assembles the pieces a host needs: the executable schema, the gateway, its
//! channel listeners and, when enabled, the devtools hub.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::bridge::{GatewayChannels, MessageBridge};
use crate::config::{DevtoolsConfig, FinchConfig};
use crate::context::{ContextOverrides, ContextSource};
use crate::devtools::{DevtoolsHub, DevtoolsPort, PortConnection, SharedReconciler};
use crate::document::QueryInput;
use crate::error::{ApiError, GatewayError};
use crate::gateway::{GatewayOptions, SchemaGateway};
use crate::schema::{ExecutableSchema, QueryResponse, Resolvers};

/// A running gateway and everything attached to it.
#[derive(Debug)]
pub struct FinchApi {
    gateway: Arc<SchemaGateway>,
    bridge: MessageBridge,
    devtools: DevtoolsConfig,
}

impl FinchApi {
    /// Build the schema from `type_defs` and `resolvers`, wrap it in a gateway
    /// and attach it to `channels` per `options.config`.
    pub fn new(
        type_defs: &str,
        resolvers: Resolvers,
        options: GatewayOptions,
        devtools: &DevtoolsConfig,
        channels: &GatewayChannels,
    ) -> Result<Self, ApiError> {
        let schema = ExecutableSchema::new(type_defs, resolvers)?;
        let message_key = options.config.message_key.clone();
        let mut gateway = SchemaGateway::new(Arc::new(schema), options);
        if devtools.enabled {
            gateway = gateway.with_devtools(DevtoolsHub::new(
                devtools.port_name.clone(),
                message_key.clone(),
            ));
        }
        let gateway = Arc::new(gateway);
        let bridge = MessageBridge::attach(gateway.clone(), channels)?;
        info!(
            message_key = %message_key,
            devtools = devtools.enabled,
            "Finch gateway ready"
        );
        Ok(Self {
            gateway,
            bridge,
            devtools: devtools.clone(),
        })
    }

    /// Same as [`FinchApi::new`] with gateway and devtools settings taken from
    /// a loaded configuration.
    pub fn from_config(
        type_defs: &str,
        resolvers: Resolvers,
        config: &FinchConfig,
        channels: &GatewayChannels,
    ) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ApiError::ConfigError(messages.join("; "))
        })?;
        Self::new(
            type_defs,
            resolvers,
            GatewayOptions::new(config.gateway.clone()),
            &config.devtools,
            channels,
        )
    }

    /// Execute a query directly, as an internal call.
    pub async fn query(
        &self,
        query: impl Into<QueryInput>,
        variables: Option<Map<String, Value>>,
        context: Option<ContextOverrides>,
    ) -> Result<QueryResponse, GatewayError> {
        self.gateway.query(query, variables, context).await
    }

    pub fn gateway(&self) -> &Arc<SchemaGateway> {
        &self.gateway
    }

    pub fn devtools(&self) -> Option<&DevtoolsHub> {
        self.gateway.devtools()
    }

    /// Open a devtools port and an observer connection for it. The observer's
    /// recording starts as configured by `DevtoolsConfig::recording`; drive it
    /// with [`PortConnection::run`].
    pub fn observe(&self) -> Result<(PortConnection, DevtoolsPort), ApiError> {
        let hub = self
            .devtools()
            .ok_or_else(|| ApiError::ConfigError("devtools are not enabled".to_string()))?;
        let port = hub.connect(&self.devtools.port_name)?;
        let (connection, _state) = PortConnection::new(SharedReconciler::from_config(&self.devtools));
        Ok((connection, port))
    }

    pub fn is_attached(&self, source: ContextSource) -> bool {
        self.bridge.is_attached(source)
    }

    /// Stop listening on message channels. Direct queries keep working.
    pub fn detach(&mut self) {
        self.bridge.detach();
    }
}
