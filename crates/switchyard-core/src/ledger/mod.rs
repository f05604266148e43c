//! Append-only usage and cost ledger.
//!
//! Every completed request (dispatched or served from cache) appends exactly
//! one [`UsageRecord`]. Aggregates are computed on demand.

mod pricing;

pub use pricing::{estimate_prompt_tokens, estimate_tokens, PriceTable};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use switchyard_types::{UsageRecord, UsageReport, UsageTotals};

use crate::metrics;

/// Tracing target for per-request usage events.
pub const USAGE_TARGET: &str = "switchyard::usage";

pub struct CostLedger {
    prices: PriceTable,
    records: Mutex<Vec<UsageRecord>>,
}

fn in_window(record: &UsageRecord, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |since| record.timestamp >= since)
}

impl CostLedger {
    pub fn new(prices: PriceTable) -> Self {
        Self { prices, records: Mutex::new(Vec::new()) }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Record a dispatched request. Cost comes from the price table; an
    /// unpriced model is billed at the default rate and flagged.
    pub fn record(
        &self,
        client_id: &str,
        model_id: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> UsageRecord {
        let (cost_estimate, known) = self.prices.cost(model_id, prompt_tokens, completion_tokens);
        if !known {
            tracing::warn!(model = %model_id, "No price configured for model, billing at default rate");
        }

        self.append(UsageRecord {
            client_id: client_id.to_string(),
            model_id: model_id.to_string(),
            prompt_tokens,
            completion_tokens,
            cost_estimate,
            timestamp: Utc::now(),
            cached: false,
            unknown_model: !known,
        })
    }

    /// Record a cache hit: zero tokens, zero cost.
    pub fn record_cached(&self, client_id: &str, model_id: &str) -> UsageRecord {
        self.append(UsageRecord {
            client_id: client_id.to_string(),
            model_id: model_id.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_estimate: 0.0,
            timestamp: Utc::now(),
            cached: true,
            unknown_model: false,
        })
    }

    /// Append a prepared record as-is.
    pub fn append(&self, record: UsageRecord) -> UsageRecord {
        tracing::info!(
            target: USAGE_TARGET,
            client_id = %record.client_id,
            model = %record.model_id,
            prompt_tokens = record.prompt_tokens,
            completion_tokens = record.completion_tokens,
            cost_usd = record.cost_estimate,
            cached = record.cached,
            unknown_model = record.unknown_model,
            "usage"
        );
        metrics::record_cost(&record.model_id, record.cost_estimate);

        self.records.lock().push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Totals for one client since `since` (inclusive), or over all time.
    pub fn usage_for(&self, client_id: &str, since: Option<DateTime<Utc>>) -> UsageTotals {
        let records = self.records.lock();
        let mut totals = UsageTotals::default();
        for record in records.iter().filter(|r| r.client_id == client_id && in_window(r, since)) {
            totals.add(record);
        }
        totals
    }

    /// Totals across every client.
    pub fn usage_all(&self, since: Option<DateTime<Utc>>) -> UsageTotals {
        let records = self.records.lock();
        let mut totals = UsageTotals::default();
        for record in records.iter().filter(|r| in_window(r, since)) {
            totals.add(record);
        }
        totals
    }

    pub fn usage_by_model(&self, since: Option<DateTime<Utc>>) -> BTreeMap<String, UsageTotals> {
        let records = self.records.lock();
        let mut by_model: BTreeMap<String, UsageTotals> = BTreeMap::new();
        for record in records.iter().filter(|r| in_window(r, since)) {
            by_model.entry(record.model_id.clone()).or_default().add(record);
        }
        by_model
    }

    pub fn report(&self, since: Option<DateTime<Utc>>) -> UsageReport {
        let records = self.records.lock();
        let mut report = UsageReport::default();
        let mut unknown = BTreeSet::new();

        for record in records.iter().filter(|r| in_window(r, since)) {
            report.totals.add(record);
            report.by_model.entry(record.model_id.clone()).or_default().add(record);
            if record.cached {
                report.cached_requests += 1;
            } else {
                report.dispatched_requests += 1;
            }
            if record.unknown_model {
                unknown.insert(record.model_id.clone());
            }
        }

        report.cache_hit_ratio = if report.totals.requests == 0 {
            0.0
        } else {
            report.cached_requests as f64 / report.totals.requests as f64
        };
        report.flagged_unknown_models = unknown.into_iter().collect();
        report
    }

    /// Drop every record, returning how many were removed.
    pub fn reset(&self) -> usize {
        let removed = std::mem::take(&mut *self.records.lock()).len();
        tracing::info!("Usage ledger reset: {} record(s) removed", removed);
        removed
    }
}

impl Default for CostLedger {
    fn default() -> Self {
        Self::new(PriceTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn test_record_computes_cost() {
        let ledger = CostLedger::default();
        let record = ledger.record("acme", "gpt-4", 1000, 500);
        assert!((record.cost_estimate - 0.025).abs() < 1e-12);
        assert!(!record.unknown_model);
        assert!(!record.cached);
    }

    #[test]
    fn test_unknown_model_is_flagged_not_rejected() {
        let ledger = CostLedger::default();
        let record = ledger.record("acme", "homebrew-7b", 1000, 1000);
        assert!(record.unknown_model);
        assert!((record.cost_estimate - 0.02).abs() < 1e-12);

        let report = ledger.report(None);
        assert_eq!(report.flagged_unknown_models, vec!["homebrew-7b".to_string()]);
        assert_eq!(report.totals.requests, 1);
    }

    #[test]
    fn test_usage_for_filters_by_client_and_time() {
        let ledger = CostLedger::default();
        ledger.record("acme", "gpt-4", 100, 10);
        ledger.record("acme", "gpt-4", 200, 20);
        ledger.record("other", "gpt-4", 999, 999);

        let totals = ledger.usage_for("acme", None);
        assert_eq!(totals.requests, 2);
        assert_eq!(totals.prompt_tokens, 300);
        assert_eq!(totals.completion_tokens, 30);

        let future = Utc::now() + Duration::hours(1);
        assert_eq!(ledger.usage_for("acme", Some(future)), UsageTotals::default());
    }

    #[test]
    fn test_usage_by_model_and_report() {
        let ledger = CostLedger::default();
        ledger.record("acme", "gpt-4", 1000, 0);
        ledger.record("acme", "claude-3-opus", 1000, 0);
        ledger.record_cached("acme", "gpt-4");

        let by_model = ledger.usage_by_model(None);
        assert_eq!(by_model.len(), 2);
        assert_eq!(by_model["gpt-4"].requests, 2);
        assert_eq!(by_model["claude-3-opus"].prompt_tokens, 1000);

        let report = ledger.report(None);
        assert_eq!(report.cached_requests, 1);
        assert_eq!(report.dispatched_requests, 2);
        assert!((report.cache_hit_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert!(report.flagged_unknown_models.is_empty());
    }

    #[test]
    fn test_cached_record_costs_nothing() {
        let ledger = CostLedger::default();
        let record = ledger.record_cached("acme", "gpt-4");
        assert!(record.cached);
        assert_eq!(record.cost_estimate, 0.0);
        assert_eq!(ledger.usage_for("acme", None).requests, 1);
    }

    #[test]
    fn test_reset_returns_count() {
        let ledger = CostLedger::default();
        ledger.record("acme", "gpt-4", 1, 1);
        ledger.record("acme", "gpt-4", 1, 1);
        assert_eq!(ledger.reset(), 2);
        assert!(ledger.is_empty());
        assert_eq!(ledger.reset(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let ledger = Arc::new(CostLedger::default());

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    for _ in 0..25 {
                        ledger.record(&format!("client-{}", i % 4), "gpt-4", 10, 5);
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(ledger.len(), 64 * 25);
        let totals = ledger.usage_all(None);
        assert_eq!(totals.requests, 1600);
        assert_eq!(totals.prompt_tokens, 16_000);
        assert_eq!(ledger.usage_for("client-0", None).requests, 400);
    }
}
