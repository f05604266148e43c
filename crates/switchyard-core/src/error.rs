//! Unified error types for startup and persistence paths.
//!
//! Request-path failures use [`switchyard_types::GatewayError`]; this type covers
//! everything that happens outside a single request (config, files, logging).

use serde::Serialize;
use thiserror::Error;

use switchyard_types::ConfigError;

/// Main error type for non-request operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider client could not be constructed.
    #[error("Provider setup error: {0}")]
    Provider(String),

    /// Logging or metrics initialisation failed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for non-request operations.
pub type AppResult<T> = Result<T, AppError>;
