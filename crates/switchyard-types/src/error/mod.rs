//! Typed error definitions for Switchyard.
//!
//! Every pipeline stage failure maps onto exactly one [`GatewayError`] variant.
//! Errors are serializable so the HTTP layer can render them verbatim.

mod config;
mod gateway;

pub use config::ConfigError;
pub use gateway::GatewayError;

/// Standard Result type for pipeline operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
