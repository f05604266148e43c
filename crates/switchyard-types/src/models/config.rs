//! Gateway configuration models.
//!
//! Every field has a serde default so a partial (or empty) JSON file is valid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use validator::Validate;

use super::key::Permission;

// ============================================================================
// Top level
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub logging: LoggingConfig,
    #[validate(nested)]
    pub rate_limits: RateLimitConfig,
    #[validate(nested)]
    pub cache: CacheConfig,
    #[validate(nested)]
    pub normalizer: NormalizerConfig,
    #[validate(nested)]
    pub pricing: PricingConfig,
    #[validate(nested)]
    pub keys: KeyRegistryConfig,
    #[validate(nested)]
    pub providers: Vec<ProviderConfig>,
}

// ============================================================================
// Server & Logging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    pub port: u16,
    /// Upper bound on one provider dispatch
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, request_timeout_secs: 300 }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1))]
    pub level: String,
    /// Daily-rolling log files are written here when set
    pub log_dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), log_dir: None, json: false }
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
pub struct LimitSpec {
    /// Burst size
    #[validate(range(min = 1))]
    pub capacity: u32,
    #[validate(range(exclusive_min = 0.0))]
    pub refill_per_second: f64,
}

impl LimitSpec {
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        Self { capacity: burst, refill_per_second: f64::from(requests_per_minute) / 60.0 }
    }
}

impl Default for LimitSpec {
    fn default() -> Self {
        Self::per_minute(60, 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
#[serde(default)]
pub struct RateLimitOverrides {
    #[validate(nested)]
    pub clients: HashMap<String, LimitSpec>,
    #[validate(nested)]
    pub models: HashMap<String, LimitSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
#[serde(default)]
pub struct RateLimitConfig {
    #[validate(nested)]
    pub client: LimitSpec,
    #[validate(nested)]
    pub model: LimitSpec,
    /// Per-subject limits applied at startup
    #[validate(nested)]
    pub overrides: RateLimitOverrides,
}

// ============================================================================
// Cache & Normalizer
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub ttl_secs: u64,
    /// 0 disables the background sweep
    pub sweep_interval_secs: u64,
    #[validate(range(min = 1))]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, ttl_secs: 3600, sweep_interval_secs: 60, max_entries: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Limit on the combined content length of all messages, in chars
    #[validate(range(min = 1))]
    pub max_total_chars: usize,
    /// Prepended when a request carries no system message
    pub default_system_message: Option<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { max_total_chars: 100_000, default_system_message: None }
    }
}

// ============================================================================
// Pricing
// ============================================================================

/// USD per 1000 tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
pub struct ModelPrice {
    #[validate(range(min = 0.0))]
    pub prompt_per_1k: f64,
    #[validate(range(min = 0.0))]
    pub completion_per_1k: f64,
}

impl ModelPrice {
    pub const fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self { prompt_per_1k, completion_per_1k }
    }

    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.prompt_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_per_1k
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct PricingConfig {
    /// Fallback for models without an entry
    #[validate(nested)]
    pub default: ModelPrice,
    #[validate(nested)]
    pub models: HashMap<String, ModelPrice>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let models = [
            ("claude-3-5-sonnet", ModelPrice::new(0.003, 0.015)),
            ("claude-3-opus", ModelPrice::new(0.015, 0.075)),
            ("claude-3-7-sonnet", ModelPrice::new(0.015, 0.075)),
            ("gpt-3.5-turbo", ModelPrice::new(0.001, 0.002)),
            ("gpt-4", ModelPrice::new(0.01, 0.03)),
            ("gpt-4-turbo", ModelPrice::new(0.01, 0.03)),
        ]
        .into_iter()
        .map(|(name, price)| (name.to_string(), price))
        .collect();

        Self { default: ModelPrice::new(0.005, 0.015), models }
    }
}

// ============================================================================
// Keys
// ============================================================================

/// A key provisioned from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SeedKey {
    /// Fixed secret; generated when absent
    #[serde(default)]
    pub key: Option<String>,
    #[validate(length(min = 1))]
    pub owner: String,
    #[serde(default = "default_seed_permissions")]
    pub permissions: Vec<Permission>,
    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,
    /// Requests per minute for this key's owner; the global client limit applies when absent
    #[serde(default)]
    #[validate(range(min = 1))]
    pub rate_limit: Option<u32>,
}

fn default_seed_permissions() -> Vec<Permission> {
    vec![Permission::Standard]
}

fn default_allowed_models() -> Vec<String> {
    vec!["*".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct KeyRegistryConfig {
    /// JSON file the registry is loaded from and persisted to
    pub store_path: Option<PathBuf>,
    #[validate(nested)]
    pub seed: Vec<SeedKey>,
    /// Create one admin key when the registry starts empty
    pub bootstrap_admin: bool,
}

impl Default for KeyRegistryConfig {
    fn default() -> Self {
        Self { store_path: None, seed: Vec::new(), bootstrap_admin: true }
    }
}

// ============================================================================
// Providers
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions`
    #[default]
    Openai,
    /// Anthropic `/v1/messages`
    Anthropic,
    /// Offline echo for local testing
    Echo,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Echo => write!(f, "echo"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ProviderConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    #[validate(url)]
    pub base_url: Option<String>,
    /// Literal API key; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Model ids routed to this provider
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    /// Resolve the API key: literal first, then the named environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.is_empty()).or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok())
                .filter(|k| !k.is_empty())
        })
    }
}
