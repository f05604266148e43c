//! # Switchyard Types
//!
//! Core types, models, and error definitions for the Switchyard gateway.
//!
//! - **`error`** - The gateway error taxonomy and configuration errors
//! - **`models`** - Domain models (keys, usage, cache, rate limits, messages, config)
//!
//! ## Architecture Role
//!
//! `switchyard-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          switchyard-types (this crate)
//!                  │
//!                  ▼
//!           switchyard-core
//!                  │
//!                  ▼
//!          switchyard-server
//! ```

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, GatewayError, GatewayResult};

// Re-export core model types
pub use models::{
    ApiKeyRecord, ApiKeySummary, CacheStats, Citation, CompletionOptions, CompletionResponse, DecodingParams, GatewayConfig,
    NormalizedMessage, Permission, RateLimitSnapshot, RawMessage, Role, UsageRecord, UsageReport,
    UsageTotals,
};
