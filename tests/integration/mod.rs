//! Integration tests for the Finch query gateway

mod cli_binary;
mod config_integration;
mod devtools_observer;
mod end_to_end;
mod test_utils;

pub use test_utils::with_xdg_env;
