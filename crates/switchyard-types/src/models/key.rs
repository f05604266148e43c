//! API key models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Wildcard entry in `allowed_models`.
pub const ALL_MODELS: &str = "*";

/// Permission carried by an API key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// May request completions and read its own usage
    Standard,
    /// May manage keys, limits, cache and usage
    Admin,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Standard => write!(f, "standard"),
            Permission::Admin => write!(f, "admin"),
        }
    }
}

/// An issued API key. Only `active` ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyRecord {
    /// Opaque secret presented by clients
    pub key: String,
    /// Owner identifier; also the rate-limit and usage client id
    pub owner: String,
    pub permissions: BTreeSet<Permission>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Models this key may use; `"*"` allows every model
    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,
    /// Requests per minute for the owner's client bucket; `None` keeps the global limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
}

fn default_allowed_models() -> Vec<String> {
    vec![ALL_MODELS.to_string()]
}

impl ApiKeyRecord {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_permission(Permission::Admin)
    }

    /// Admin keys satisfy every permission check.
    pub fn grants(&self, required: Permission) -> bool {
        self.is_admin() || self.has_permission(required)
    }

    /// Check if a model is allowed for this key.
    pub fn allows_model(&self, model: &str) -> bool {
        self.allowed_models.iter().any(|m| m == ALL_MODELS || m == model)
    }

    /// Key shown as `first8...last4`, safe for listings and logs.
    pub fn masked_key(&self) -> String {
        mask_key(&self.key)
    }

    /// The client identity used for rate limiting and cost accounting.
    pub fn client_id(&self) -> &str {
        &self.owner
    }
}

pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Listing view of a key without the secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKeySummary {
    pub key: String,
    pub owner: String,
    pub permissions: BTreeSet<Permission>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub allowed_models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
}

impl From<&ApiKeyRecord> for ApiKeySummary {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            key: record.masked_key(),
            owner: record.owner.clone(),
            permissions: record.permissions.clone(),
            active: record.active,
            created_at: record.created_at,
            allowed_models: record.allowed_models.clone(),
            rate_limit: record.rate_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(allowed: &[&str]) -> ApiKeyRecord {
        ApiKeyRecord {
            key: "sy_0123456789abcdefghijklmnopqrstuv".to_string(),
            owner: "acme".to_string(),
            permissions: BTreeSet::from([Permission::Standard]),
            active: true,
            created_at: Utc::now(),
            allowed_models: allowed.iter().map(|s| s.to_string()).collect(),
            rate_limit: None,
        }
    }

    #[test]
    fn test_wildcard_allows_any_model() {
        assert!(record(&["*"]).allows_model("gpt-4"));
        assert!(record(&["gpt-4"]).allows_model("gpt-4"));
        assert!(!record(&["gpt-4"]).allows_model("claude-3-opus"));
    }

    #[test]
    fn test_masked_key() {
        assert_eq!(record(&["*"]).masked_key(), "sy_01234...stuv");
        assert_eq!(mask_key("short"), "*****");
    }

    #[test]
    fn test_missing_allowed_models_defaults_to_wildcard() {
        let json = r#"{"key":"k","owner":"o","permissions":["admin"],"active":true,"created_at":"2026-01-01T00:00:00Z"}"#;
        let parsed: ApiKeyRecord = serde_json::from_str(json).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(parsed.allowed_models, vec!["*".to_string()]);
        assert_eq!(parsed.rate_limit, None);
        assert!(parsed.is_admin());
    }

    #[test]
    fn test_summary_carries_rate_limit() {
        let mut limited = record(&["*"]);
        limited.rate_limit = Some(30);
        let summary = ApiKeySummary::from(&limited);
        assert_eq!(summary.rate_limit, Some(30));

        let json = serde_json::to_value(ApiKeySummary::from(&record(&["*"]))).unwrap_or_else(|e| panic!("{e}"));
        assert!(json.get("rate_limit").is_none());
    }
}
