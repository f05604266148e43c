//! # Switchyard Core
//!
//! Request pipeline and stateful engines for the Switchyard LLM gateway.
//!
//! ## Layout
//!
//! ```text
//! switchyard-core/src/
//! ├── registry/     # API keys, permissions, optional JSON persistence
//! ├── rate_limit/   # Token buckets per client and per model
//! ├── cache/        # Fingerprint-keyed response cache with TTL
//! ├── normalizer.rs # Raw chat messages → canonical form
//! ├── citations.rs  # Markdown links → numbered citation markers
//! ├── ledger/       # Usage records, pricing, reports
//! ├── provider/     # CompletionProvider + OpenAI / Anthropic / echo clients
//! ├── pipeline/     # Gateway: drives one request through every stage
//! ├── config.rs     # File + environment configuration loading
//! ├── logging.rs    # tracing subscriber setup
//! └── metrics.rs    # Prometheus recorder
//! ```
//!
//! Every engine is shared as `Arc<_>` and synchronizes internally, so the
//! [`Gateway`] can be driven from many tasks at once.

#![allow(
    clippy::significant_drop_tightening,
    reason = "DashMap entry guards are held across short read-modify-write sections"
)]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, unwrap, float comparisons in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::float_cmp,
        clippy::assertions_on_result_states
    )
)]

pub mod cache;
pub mod citations;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod provider;
pub mod rate_limit;
pub mod registry;

// Re-export commonly used types
pub use cache::ResponseCache;
pub use error::{AppError, AppResult};
pub use ledger::CostLedger;
pub use normalizer::MessageNormalizer;
pub use pipeline::{Gateway, GatewayOptions, RequestStage};
pub use provider::{CompletionProvider, ProviderError, ProviderRouter};
pub use rate_limit::RateLimiter;
pub use registry::KeyRegistry;
