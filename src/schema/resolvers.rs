//! Field resolvers keyed by `Type.field`.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::context::ExecutionContext;

/// Inputs handed to a resolver.
#[derive(Debug, Clone)]
pub struct ResolverArgs {
    /// Value produced by the parent field (`{"root": true}` at the root)
    pub parent: Value,
    pub args: Map<String, Value>,
    pub context: ExecutionContext,
    pub field_name: String,
}

/// Failure reported by a resolver; surfaces in the response `errors`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for ResolverError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

pub type ResolverFuture = BoxFuture<'static, Result<Value, ResolverError>>;
pub type Resolver = Arc<dyn Fn(ResolverArgs) -> ResolverFuture + Send + Sync>;

/// Resolver map passed alongside type definitions.
#[derive(Clone, Default)]
pub struct Resolvers {
    fields: HashMap<(String, String), Resolver>,
}

impl Resolvers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async resolver for `type_name.field_name`.
    pub fn field<F, Fut>(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: F,
    ) -> Self
    where
        F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResolverError>> + Send + 'static,
    {
        let resolver: Resolver = Arc::new(move |args| resolver(args).boxed());
        self.fields
            .insert((type_name.into(), field_name.into()), resolver);
        self
    }

    /// Register a resolver that always returns `value`.
    pub fn value(
        self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        value: Value,
    ) -> Self {
        self.field(type_name, field_name, move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<Resolver> {
        self.fields
            .get(&(type_name.to_string(), field_name.to_string()))
            .cloned()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .keys()
            .map(|(type_name, field_name)| (type_name.as_str(), field_name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .keys()
            .map(|(type_name, field_name)| format!("{type_name}.{field_name}"))
            .collect();
        keys.sort();
        f.debug_struct("Resolvers").field("fields", &keys).finish()
    }
}

/// Resolver used for fields without an explicit entry: reads the field's key
/// from the parent object.
pub(crate) fn default_resolve(args: &ResolverArgs) -> Value {
    args.parent
        .get(&args.field_name)
        .cloned()
        .unwrap_or(Value::Null)
}
