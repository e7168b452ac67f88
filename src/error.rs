//! Error types for the Finch query gateway.

use thiserror::Error;

/// Errors raised by a single gateway call.
///
/// Engine-reported execution errors are not represented here: they travel in
/// the `errors` array of a successful [`crate::schema::QueryResponse`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Query parse error: {0}")]
    Parse(String),

    #[error("Execution engine failure: {0}")]
    Engine(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No listener answered message type '{0}'")]
    NoResponse(String),
}

/// Schema construction errors
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Type definitions failed to parse: {0}")]
    Parse(String),

    #[error("Schema has no query root type '{0}'")]
    MissingQueryType(String),

    #[error("Unsupported {kind} definition: {name}")]
    Unsupported { kind: &'static str, name: String },

    #[error("Resolver defined for {type_name}.{field_name}, which is not in the schema")]
    UnknownResolver {
        type_name: String,
        field_name: String,
    },

    #[error("Schema build failed: {0}")]
    Build(String),
}

/// Channel and port errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No extension registered with id '{0}'")]
    UnknownExtension(String),

    #[error("Unknown port name '{0}'")]
    UnknownPort(String),

    #[error("Port is disconnected")]
    PortClosed,
}

/// Top-level errors for construction, configuration and the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
