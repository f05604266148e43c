//! Request pipeline orchestration.
//!
//! [`Gateway`] owns constructor-injected engines and drives each completion
//! request through its stages:
//!
//! ```text
//! Received → Authenticated → RateChecked → Normalized → CacheChecked
//!                                                        ├─ hit  → CacheHit → Recorded
//!                                                        └─ miss → Dispatching → Completed → Recorded
//! ```
//!
//! Any stage may end in `Rejected` with exactly one [`GatewayError`]. Only the
//! provider dispatch awaits; every other stage completes without I/O.

mod stage;


pub use stage::RequestStage;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use switchyard_types::models::key::ALL_MODELS;
use switchyard_types::models::{GatewayConfig, LimitSpec, SubjectKind};
use switchyard_types::{
    ApiKeyRecord, CacheStats, CompletionOptions, CompletionResponse, DecodingParams, GatewayError, GatewayResult, Permission,
    RateLimitSnapshot, RawMessage, UsageReport, UsageTotals,
};

use crate::cache::{compute_fingerprint, ResponseCache};
use crate::citations::extract_citations;
use crate::error::AppResult;
use crate::ledger::{estimate_prompt_tokens, estimate_tokens, CostLedger, PriceTable};
use crate::metrics;
use crate::normalizer::MessageNormalizer;
use crate::provider::{CompletionProvider, ProviderError, ProviderRouter};
use crate::rate_limit::RateLimiter;
use crate::registry::KeyRegistry;
use stage::RequestTrace;

/// Tokens charged to each bucket per completion request.
const REQUEST_COST: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Global cache switch; requests may still opt out individually
    pub cache_enabled: bool,
    /// Upper bound on one provider dispatch
    pub request_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self { cache_enabled: true, request_timeout: Duration::from_secs(300) }
    }
}

pub struct Gateway {
    registry: Arc<KeyRegistry>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    normalizer: Arc<MessageNormalizer>,
    ledger: Arc<CostLedger>,
    provider: Arc<dyn CompletionProvider>,
    options: GatewayOptions,
}

impl Gateway {
    pub fn new(
        registry: Arc<KeyRegistry>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        normalizer: Arc<MessageNormalizer>,
        ledger: Arc<CostLedger>,
        provider: Arc<dyn CompletionProvider>,
        options: GatewayOptions,
    ) -> Self {
        let gateway = Self { registry, limiter, cache, normalizer, ledger, provider, options };
        for record in gateway.registry.list().iter().filter(|r| r.active) {
            gateway.apply_key_limit(record);
        }
        gateway
    }

    /// Wire every engine from configuration. Read once, never polled.
    pub fn from_config(config: &GatewayConfig) -> AppResult<Self> {
        let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
        let provider = ProviderRouter::from_config(&config.providers, request_timeout)?;

        Ok(Self::new(
            Arc::new(KeyRegistry::from_config(&config.keys)?),
            Arc::new(RateLimiter::from_config(&config.rate_limits)),
            Arc::new(ResponseCache::from_config(&config.cache)),
            Arc::new(MessageNormalizer::new(&config.normalizer)),
            Arc::new(CostLedger::new(PriceTable::from_config(&config.pricing))),
            Arc::new(provider),
            GatewayOptions { cache_enabled: config.cache.enabled, request_timeout },
        ))
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    pub fn authenticate(&self, api_key: &str) -> GatewayResult<ApiKeyRecord> {
        self.registry.authenticate(api_key)
    }

    fn require_admin(&self, caller: &ApiKeyRecord) -> GatewayResult<()> {
        self.registry.authorize(caller, Permission::Admin)
    }

    /// Pin the owner's client bucket to the key's requests-per-minute limit.
    fn apply_key_limit(&self, record: &ApiKeyRecord) {
        if let Some(rpm) = record.rate_limit.filter(|rpm| *rpm > 0) {
            self.limiter.set_limit(SubjectKind::Client, record.client_id(), LimitSpec::per_minute(rpm, rpm));
        }
    }

    // ========================================================================
    // Completion pipeline
    // ========================================================================

    /// Run one completion request through the pipeline.
    ///
    /// Dropping the returned future abandons the provider call; nothing is
    /// cached or recorded for an abandoned request.
    pub async fn handle_completion(
        &self,
        api_key: &str,
        raw_messages: &[RawMessage],
        model_id: &str,
        params: &DecodingParams,
    ) -> GatewayResult<CompletionResponse> {
        self.handle_completion_with(api_key, raw_messages, model_id, params, &CompletionOptions::default())
            .await
    }

    /// [`handle_completion`](Self::handle_completion) with prompt enhancements
    /// and citation extraction.
    ///
    /// Enhancements become part of the normalized messages and therefore of
    /// the fingerprint. Citations are extracted from the answer after the
    /// cache, so cached entries always hold the provider's text.
    pub async fn handle_completion_with(
        &self,
        api_key: &str,
        raw_messages: &[RawMessage],
        model_id: &str,
        params: &DecodingParams,
        options: &CompletionOptions,
    ) -> GatewayResult<CompletionResponse> {
        let mut trace = RequestTrace::new(uuid::Uuid::new_v4().to_string(), model_id);

        let result = self.run(&mut trace, api_key, raw_messages, params, options).await;
        match result.map(|response| with_citations(response, options.extract_citations)) {
            Ok(response) => {
                let outcome = if response.cached { "cache_hit" } else { "completed" };
                metrics::record_request(outcome);
                tracing::info!(
                    request_id = %trace.request_id,
                    model = %trace.model_id,
                    cached = response.cached,
                    prompt_tokens = response.prompt_tokens,
                    completion_tokens = response.completion_tokens,
                    elapsed_ms = trace.elapsed_ms() as u64,
                    "Completion served"
                );
                Ok(response)
            },
            Err(err) => {
                let failed_at = trace.stage();
                trace.advance(RequestStage::Rejected);
                metrics::record_request(err.kind());
                if err.is_client_error() {
                    tracing::debug!(request_id = %trace.request_id, stage = %failed_at, "Request rejected: {}", err);
                } else {
                    tracing::warn!(request_id = %trace.request_id, stage = %failed_at, "Request failed: {}", err);
                }
                Err(err)
            },
        }
    }

    async fn run(
        &self,
        trace: &mut RequestTrace,
        api_key: &str,
        raw_messages: &[RawMessage],
        params: &DecodingParams,
        options: &CompletionOptions,
    ) -> GatewayResult<CompletionResponse> {
        let model_id = trace.model_id.clone();

        // Received → Authenticated
        let record = self.registry.authenticate(api_key)?;
        self.registry.authorize(&record, Permission::Standard)?;
        if model_id.trim().is_empty() {
            return Err(GatewayError::invalid_input("model must not be empty"));
        }
        if !record.allows_model(&model_id) {
            return Err(GatewayError::forbidden(format!(
                "Access to model '{}' is not allowed with this API key",
                model_id
            )));
        }
        let client_id = record.client_id().to_string();
        trace.advance(RequestStage::Authenticated);

        // Authenticated → RateChecked
        self.limiter.admit(&client_id, &model_id, REQUEST_COST)?;
        trace.advance(RequestStage::RateChecked);

        // RateChecked → Normalized
        let messages = self.normalizer.normalize_with(raw_messages, &options.enhancements)?;
        trace.advance(RequestStage::Normalized);

        // Normalized → CacheChecked
        let fingerprint = compute_fingerprint(&messages, &model_id, params);
        let use_cache = self.options.cache_enabled && params.cache_enabled(true);
        let cached = if use_cache { self.cache.get(&fingerprint) } else { None };
        trace.advance(RequestStage::CacheChecked);

        if let Some(entry) = cached {
            trace.advance(RequestStage::CacheHit);
            self.ledger.record_cached(&client_id, &model_id);
            trace.advance(RequestStage::Recorded);
            return Ok(CompletionResponse {
                request_id: trace.request_id.clone(),
                cost_estimate: 0.0,
                cached: true,
                hit_count: entry.hit_count,
                ..entry.response
            });
        }

        // CacheChecked → Dispatching → Completed
        trace.advance(RequestStage::Dispatching);
        let started = Instant::now();
        let dispatch = self.provider.complete(&messages, &model_id, params);
        let completion = match tokio::time::timeout(self.options.request_timeout, dispatch).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.options.request_timeout)),
        };
        metrics::record_provider_duration(&model_id, started.elapsed());
        let completion = completion?;
        trace.advance(RequestStage::Completed);

        // Completed → Recorded
        let prompt_tokens = completion.prompt_tokens.unwrap_or_else(|| estimate_prompt_tokens(&messages));
        let completion_tokens =
            completion.completion_tokens.unwrap_or_else(|| estimate_tokens(&completion.content));
        let usage = self.ledger.record(&client_id, &model_id, prompt_tokens, completion_tokens);

        let response = CompletionResponse {
            request_id: trace.request_id.clone(),
            model: model_id,
            content: completion.content,
            prompt_tokens,
            completion_tokens,
            cost_estimate: usage.cost_estimate,
            cached: false,
            fingerprint: fingerprint.clone(),
            hit_count: 0,
            citations: Vec::new(),
        };
        if use_cache {
            self.cache.insert(&fingerprint, response.clone());
        }
        trace.advance(RequestStage::Recorded);

        Ok(response)
    }

    // ========================================================================
    // Usage
    // ========================================================================

    /// Totals for `client_id`, or for every client when `None`.
    ///
    /// Standard keys may only see their own usage.
    pub fn get_usage(
        &self,
        caller: &ApiKeyRecord,
        client_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> GatewayResult<UsageTotals> {
        match client_id {
            Some(id) if id == caller.client_id() => Ok(self.ledger.usage_for(id, since)),
            Some(id) => {
                self.require_admin(caller)?;
                Ok(self.ledger.usage_for(id, since))
            },
            None if caller.is_admin() => Ok(self.ledger.usage_all(since)),
            None => Ok(self.ledger.usage_for(caller.client_id(), since)),
        }
    }

    pub fn get_usage_by_model(
        &self,
        caller: &ApiKeyRecord,
        since: Option<DateTime<Utc>>,
    ) -> GatewayResult<BTreeMap<String, UsageTotals>> {
        self.require_admin(caller)?;
        Ok(self.ledger.usage_by_model(since))
    }

    pub fn get_usage_report(
        &self,
        caller: &ApiKeyRecord,
        since: Option<DateTime<Utc>>,
    ) -> GatewayResult<UsageReport> {
        self.require_admin(caller)?;
        Ok(self.ledger.report(since))
    }

    pub fn reset_usage(&self, caller: &ApiKeyRecord) -> GatewayResult<usize> {
        self.require_admin(caller)?;
        tracing::info!(by = %caller.owner, "Resetting usage ledger");
        Ok(self.ledger.reset())
    }

    // ========================================================================
    // Cache
    // ========================================================================

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self, caller: &ApiKeyRecord) -> GatewayResult<usize> {
        self.require_admin(caller)?;
        tracing::info!(by = %caller.owner, "Clearing response cache");
        Ok(self.cache.clear())
    }

    // ========================================================================
    // Rate limits
    // ========================================================================

    /// Snapshot of a bucket. Standard keys may inspect their own client
    /// bucket and any model bucket.
    pub fn get_rate_limit_status(
        &self,
        caller: &ApiKeyRecord,
        kind: SubjectKind,
        subject_id: &str,
    ) -> GatewayResult<RateLimitSnapshot> {
        if kind == SubjectKind::Client && subject_id != caller.client_id() {
            self.require_admin(caller)?;
        }
        Ok(self.limiter.status(kind, subject_id))
    }

    pub fn set_client_rate_limit(
        &self,
        caller: &ApiKeyRecord,
        client_id: &str,
        capacity: u32,
        refill_per_second: f64,
    ) -> GatewayResult<RateLimitSnapshot> {
        self.set_rate_limit(caller, SubjectKind::Client, client_id, capacity, refill_per_second)
    }

    pub fn set_model_rate_limit(
        &self,
        caller: &ApiKeyRecord,
        model_id: &str,
        capacity: u32,
        refill_per_second: f64,
    ) -> GatewayResult<RateLimitSnapshot> {
        self.set_rate_limit(caller, SubjectKind::Model, model_id, capacity, refill_per_second)
    }

    fn set_rate_limit(
        &self,
        caller: &ApiKeyRecord,
        kind: SubjectKind,
        subject_id: &str,
        capacity: u32,
        refill_per_second: f64,
    ) -> GatewayResult<RateLimitSnapshot> {
        self.require_admin(caller)?;
        if subject_id.trim().is_empty() {
            return Err(GatewayError::invalid_input(format!("{} id must not be empty", kind)));
        }
        if capacity == 0 {
            return Err(GatewayError::invalid_input("capacity must be at least 1"));
        }
        if !refill_per_second.is_finite() || refill_per_second <= 0.0 {
            return Err(GatewayError::invalid_input("refill rate must be a positive number"));
        }

        self.limiter.set_limit(kind, subject_id, LimitSpec { capacity, refill_per_second });
        Ok(self.limiter.status(kind, subject_id))
    }

    // ========================================================================
    // Keys
    // ========================================================================

    pub fn create_api_key(
        &self,
        caller: &ApiKeyRecord,
        owner: &str,
        permissions: Vec<Permission>,
        allowed_models: Option<Vec<String>>,
        rate_limit: Option<u32>,
    ) -> GatewayResult<ApiKeyRecord> {
        self.require_admin(caller)?;
        let models = allowed_models.unwrap_or_else(|| vec![ALL_MODELS.to_string()]);
        let record = self.registry.create_with_limit(owner, permissions, models, rate_limit)?;
        self.apply_key_limit(&record);
        Ok(record)
    }

    pub fn deactivate_api_key(&self, caller: &ApiKeyRecord, key: &str) -> GatewayResult<()> {
        self.require_admin(caller)?;
        self.registry.deactivate(key)
    }

    pub fn list_api_keys(&self, caller: &ApiKeyRecord) -> GatewayResult<Vec<ApiKeyRecord>> {
        self.require_admin(caller)?;
        Ok(self.registry.list())
    }
}

fn with_citations(response: CompletionResponse, extract: bool) -> CompletionResponse {
    if !extract {
        return response;
    }
    let (content, citations) = extract_citations(&response.content);
    CompletionResponse { content, citations, ..response }
}
