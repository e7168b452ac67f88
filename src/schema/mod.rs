//! Execution engine seam.
//!
//! The gateway never executes queries itself. It hands an [`EngineRequest`] to a
//! [`QueryEngine`] and returns whatever the engine reports. [`ExecutableSchema`]
//! is the bundled engine built from type definitions and resolvers.

mod executable;
mod resolvers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::error::GatewayError;

pub use executable::ExecutableSchema;
pub use resolvers::{Resolver, ResolverArgs, ResolverError, ResolverFuture, Resolvers};

/// Source location of an execution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}

/// Engine-reported error, returned as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }
}

/// `{data, errors}` result of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<QueryError>>,
}

impl QueryResponse {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    pub fn first_error(&self) -> Option<&QueryError> {
        self.errors.as_ref().and_then(|errors| errors.first())
    }
}

/// Everything the engine needs for one execution.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub query: String,
    pub variables: Map<String, Value>,
    pub context: ExecutionContext,
    pub operation_name: Option<String>,
    pub root_value: Value,
}

/// Query execution engine.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute a query. Execution errors belong in the response; `Err` is for
    /// failures where no response exists at all.
    async fn execute(&self, request: EngineRequest) -> Result<QueryResponse, GatewayError>;
}
