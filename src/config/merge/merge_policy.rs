//! Merge rules: defaults applied before any file or environment source.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

use crate::devtools::DEVTOOLS_PORT_NAME;
use crate::wire::GENERIC_MESSAGE_KEY;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("gateway.message_key", GENERIC_MESSAGE_KEY)?
        .set_default("gateway.attach_messages", false)?
        .set_default("gateway.attach_external_messages", false)?
        .set_default("devtools.enabled", false)?
        .set_default("devtools.port_name", DEVTOOLS_PORT_NAME)?
        .set_default("devtools.recording", true)
}
