//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, GatewayError};

/// Map domain errors to a single line for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Gateway(GatewayError::NoResponse(key)) => {
            format!("No gateway is listening for message type '{}'", key)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error() {
        let err = ApiError::Gateway(GatewayError::NoResponse("KEY".to_string()));
        assert!(map_error(&err).contains("'KEY'"));
        let err = ApiError::ConfigError("bad".to_string());
        assert_eq!(map_error(&err), "Configuration error: bad");
    }
}
