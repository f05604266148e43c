//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Config file could not be parsed
    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    /// A field failed validation
    #[error("Invalid config value for {field}: {message}")]
    ValidationError { field: String, message: String },

    /// Environment override had an unusable value
    #[error("Invalid environment variable {name}: {message}")]
    InvalidEnv { name: String, message: String },
}
