//! Usage and cost accounting models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One completed request. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub client_id: String,
    pub model_id: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Estimated cost in USD; zero for cache hits
    pub cost_estimate: f64,
    pub timestamp: DateTime<Utc>,
    /// Served from cache instead of a provider dispatch
    #[serde(default)]
    pub cached: bool,
    /// Model had no price entry and was billed at the default rate
    #[serde(default)]
    pub unknown_model: bool,
}

/// Aggregated totals over a set of usage records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UsageTotals {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_cost: f64,
}

impl UsageTotals {
    pub fn add(&mut self, record: &UsageRecord) {
        self.requests = self.requests.saturating_add(1);
        self.prompt_tokens = self.prompt_tokens.saturating_add(record.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(record.completion_tokens);
        self.total_cost += record.cost_estimate;
    }

    /// Counters saturate at `u64::MAX` instead of wrapping.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Full usage report for administrators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UsageReport {
    pub totals: UsageTotals,
    pub cached_requests: u64,
    pub dispatched_requests: u64,
    pub cache_hit_ratio: f64,
    pub by_model: BTreeMap<String, UsageTotals>,
    /// Models billed at the default rate because no price was configured
    pub flagged_unknown_models: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(prompt_tokens: u64, completion_tokens: u64) -> UsageRecord {
        UsageRecord {
            client_id: "acme".to_string(),
            model_id: "gpt-4".to_string(),
            prompt_tokens,
            completion_tokens,
            cost_estimate: 0.5,
            timestamp: Utc::now(),
            cached: false,
            unknown_model: false,
        }
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = UsageTotals::default();
        totals.add(&record(10, 5));
        totals.add(&record(3, 2));
        assert_eq!(totals.requests, 2);
        assert_eq!(totals.total_tokens(), 20);
        assert!((totals.total_cost - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_totals_saturate_on_huge_counts() {
        let mut totals = UsageTotals::default();
        totals.add(&record(u64::MAX - 1, u64::MAX));
        totals.add(&record(10, 10));
        assert_eq!(totals.prompt_tokens, u64::MAX);
        assert_eq!(totals.completion_tokens, u64::MAX);
        assert_eq!(totals.total_tokens(), u64::MAX);
        assert_eq!(totals.requests, 2);
    }
}
