//! Domain models.

pub mod cache;
pub mod completion;
pub mod config;
pub mod key;
pub mod message;
pub mod rate_limit;
pub mod usage;

pub use cache::CacheStats;
pub use completion::{Citation, CompletionResponse, ProviderCompletion};
pub use config::{
    CacheConfig, GatewayConfig, KeyRegistryConfig, LimitSpec, LoggingConfig, ModelPrice,
    NormalizerConfig, PricingConfig, ProviderConfig, ProviderKind, RateLimitConfig,
    RateLimitOverrides, SeedKey, ServerConfig,
};
pub use key::{ApiKeyRecord, ApiKeySummary, Permission};
pub use message::{CompletionOptions, DecodingParams, NormalizedMessage, RawMessage, Role};
pub use rate_limit::{RateLimitSnapshot, SubjectKind};
pub use usage::{UsageRecord, UsageReport, UsageTotals};
