//! CLI route: single route table and run context.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::api::FinchApi;
use crate::bridge::GatewayChannels;
use crate::cli::parse::Commands;
use crate::client::{query_api, QueryApiOptions};
use crate::config::{ConfigLoader, FinchConfig};
use crate::error::ApiError;
use crate::gateway::GatewayOptions;
use crate::schema::{ExecutableSchema, QueryResponse, Resolvers};
use crate::transport::{InMemoryChannel, LocalTransport};

/// Extension id the CLI uses when it talks to its own gateway over a channel.
const CLI_EXTENSION_ID: &str = "finch-cli";

/// Runtime context for CLI execution: workspace and loaded configuration.
pub struct RunContext {
    config: FinchConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self {
            config,
            workspace_root,
        })
    }

    pub fn config(&self) -> &FinchConfig {
        &self.config
    }

    /// Execute a CLI command and return its printable output.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = match command {
            Commands::Query {
                schema,
                data,
                variables,
                via_message,
                query,
            } => {
                self.handle_query(schema, data.as_deref(), variables.as_deref(), *via_message, query)
                    .await
            }
            Commands::Sdl { schema } => self.handle_sdl(schema),
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
        };
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn handle_query(
        &self,
        schema: &Path,
        data: Option<&Path>,
        variables: Option<&str>,
        via_message: bool,
        query: &str,
    ) -> Result<String, ApiError> {
        let type_defs = std::fs::read_to_string(self.resolve(schema))?;
        let resolvers = match data {
            Some(path) => root_resolvers(&std::fs::read_to_string(self.resolve(path))?)?,
            None => Resolvers::new(),
        };
        let variables = parse_variables(variables)?;

        let response = if via_message {
            self.query_via_message(&type_defs, resolvers, query, variables)
                .await?
        } else {
            let api = FinchApi::new(
                &type_defs,
                resolvers,
                GatewayOptions::new(self.config.gateway.clone()),
                &self.config.devtools,
                &GatewayChannels::default(),
            )?;
            api.query(query, Some(variables), None).await?
        };
        format_response(&response)
    }

    /// Route the query through an in-process runtime channel, the way a
    /// content script would reach its background gateway.
    async fn query_via_message(
        &self,
        type_defs: &str,
        resolvers: Resolvers,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<QueryResponse, ApiError> {
        let channel = Arc::new(InMemoryChannel::new("runtime"));
        let mut gateway_config = self.config.gateway.clone();
        gateway_config.attach_messages = true;
        gateway_config.attach_external_messages = false;
        let message_key = gateway_config.message_key.clone();

        let _api = FinchApi::new(
            type_defs,
            resolvers,
            GatewayOptions::new(gateway_config),
            &self.config.devtools,
            &GatewayChannels::new().with_internal(channel.clone()),
        )?;
        let transport = LocalTransport::new(CLI_EXTENSION_ID, channel);
        let options = QueryApiOptions::default().with_message_key(message_key);
        Ok(query_api(&transport, query, variables, &options).await?)
    }

    fn handle_sdl(&self, schema: &Path) -> Result<String, ApiError> {
        let type_defs = std::fs::read_to_string(self.resolve(schema))?;
        Ok(ExecutableSchema::new(&type_defs, Resolvers::new())?.sdl())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Query { .. } => "query",
        Commands::Sdl { .. } => "sdl",
        Commands::Config => "config",
    }
}

/// One constant resolver per top-level key of a JSON object.
fn root_resolvers(raw: &str) -> Result<Resolvers, ApiError> {
    let data: Value = serde_json::from_str(raw)
        .map_err(|e| ApiError::InvalidInput(format!("data file is not JSON: {}", e)))?;
    let Value::Object(fields) = data else {
        return Err(ApiError::InvalidInput(
            "data file must contain a JSON object".to_string(),
        ));
    };
    Ok(fields
        .into_iter()
        .fold(Resolvers::new(), |resolvers, (field, value)| {
            resolvers.value("Query", field, value)
        }))
}

fn parse_variables(raw: Option<&str>) -> Result<Map<String, Value>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str(raw) {
        Ok(Value::Object(variables)) => Ok(variables),
        Ok(_) => Err(ApiError::InvalidInput(
            "variables must be a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::InvalidInput(format!(
            "variables are not JSON: {}",
            e
        ))),
    }
}

fn format_response(response: &QueryResponse) -> Result<String, ApiError> {
    serde_json::to_string_pretty(response)
        .map_err(|e| ApiError::InvalidInput(format!("Failed to render response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("schema.graphql"),
            "type Query { greeting: String, count: Int }",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("data.json"),
            r#"{ "greeting": "hi", "count": 2 }"#,
        )
        .unwrap();
        temp
    }

    fn query_command(query: &str, via_message: bool) -> Commands {
        Commands::Query {
            schema: PathBuf::from("schema.graphql"),
            data: Some(PathBuf::from("data.json")),
            variables: None,
            via_message,
            query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_query_command_direct() {
        let temp = workspace();
        let context = RunContext::new(temp.path().to_path_buf(), None).unwrap();
        let output = context
            .execute(&query_command("{ greeting count }", false))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!({ "data": { "greeting": "hi", "count": 2 } }));
    }

    #[tokio::test]
    async fn test_query_command_via_message() {
        let temp = workspace();
        let context = RunContext::new(temp.path().to_path_buf(), None).unwrap();
        let output = context
            .execute(&query_command("{ greeting }", true))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!({ "data": { "greeting": "hi" } }));
    }

    #[tokio::test]
    async fn test_sdl_command() {
        let temp = workspace();
        let context = RunContext::new(temp.path().to_path_buf(), None).unwrap();
        let output = context
            .execute(&Commands::Sdl {
                schema: PathBuf::from("schema.graphql"),
            })
            .await
            .unwrap();
        assert!(output.contains("greeting"));
    }

    #[tokio::test]
    async fn test_config_command_renders_toml() {
        let temp = workspace();
        let context = RunContext::new(temp.path().to_path_buf(), None).unwrap();
        let output = context.execute(&Commands::Config).await.unwrap();
        assert!(output.contains("message_key"));
    }

    #[test]
    fn test_parse_variables() {
        assert!(parse_variables(None).unwrap().is_empty());
        let variables = parse_variables(Some(r#"{ "id": 1 }"#)).unwrap();
        assert_eq!(variables.get("id"), Some(&json!(1)));
        assert!(matches!(
            parse_variables(Some("[1]")),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_root_resolvers_require_object() {
        assert_eq!(root_resolvers(r#"{ "a": 1, "b": 2 }"#).unwrap().len(), 2);
        assert!(matches!(
            root_resolvers("3"),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
