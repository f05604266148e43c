//! Completion results.

use serde::{Deserialize, Serialize};

/// What a provider returns for one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderCompletion {
    pub content: String,
    /// `None` when the provider did not report usage
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Successful result of the completion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    pub request_id: String,
    pub model: String,
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Incremental cost of this request; zero for cache hits
    pub cost_estimate: f64,
    pub cached: bool,
    /// Hex digest the response is cached under
    pub fingerprint: String,
    /// Hits recorded on the cache entry, including this one
    pub hit_count: u64,
    /// Links pulled out of `content` when citation extraction was requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

/// A link replaced by a `[n]` marker in the response content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// 1-based marker number
    pub id: u32,
    pub label: String,
    pub url: String,
}
