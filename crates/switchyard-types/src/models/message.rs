//! Chat message models.
//!
//! [`RawMessage`] is what clients send and is never trusted downstream.
//! [`NormalizedMessage`] only comes out of the normalizer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Recognized message roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated message as received from a client.
///
/// `content` is either a string or an array of `{"type": "text", "text": ...}` parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl RawMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            content: Some(serde_json::Value::String(content.to_string())),
        }
    }
}

/// A validated message: recognized role, trimmed non-empty content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NormalizedMessage {
    pub role: Role,
    pub content: String,
}

/// Decoding parameters forwarded to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DecodingParams {
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stop: Vec<String>,
    /// Per-request cache switch; not part of the fingerprint
    #[serde(default)]
    pub use_cache: Option<bool>,
}

impl DecodingParams {
    pub fn cache_enabled(&self, default: bool) -> bool {
        self.use_cache.unwrap_or(default)
    }
}

/// Request-level extras that shape the prompt or post-process the answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompletionOptions {
    /// Appended to the system message as `key: value` lines
    #[serde(default)]
    pub enhancements: BTreeMap<String, serde_json::Value>,
    /// Replace markdown links in the answer with numbered citation markers
    #[serde(default)]
    pub extract_citations: bool,
}
