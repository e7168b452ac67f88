//! Config loading entry points.

use config::{Environment, File};
use std::path::Path;
use tracing::debug;

use crate::config::merge::merge_policy::builder_with_defaults;
use crate::config::sources::{global_file, workspace_file};
use crate::config::FinchConfig;
use crate::error::ApiError;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load layered configuration for `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<FinchConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config: FinchConfig = builder
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        debug!(workspace_root = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single configuration file over the defaults.
    pub fn load_from_file(path: &Path) -> Result<FinchConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config: FinchConfig = builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix("FINCH")
            .separator("__")
            .try_parsing(true)
    }
}
