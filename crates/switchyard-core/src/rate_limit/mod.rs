//! Token-bucket admission control, one bucket per client and one per model.
//!
//! Buckets live in `DashMap`s; every refill-and-acquire runs while holding the
//! shard lock for that entry, so concurrent requests cannot spend the same
//! tokens twice. A request holds at most one bucket lock at a time.

mod bucket;


pub use bucket::TokenBucket;

use dashmap::DashMap;
use std::time::Instant;

use switchyard_types::models::{LimitSpec, RateLimitConfig, SubjectKind};
use switchyard_types::{GatewayError, GatewayResult, RateLimitSnapshot};

/// Outcome of a single-bucket acquire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Granted,
    Denied { retry_after_secs: f64 },
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }
}

pub struct RateLimiter {
    clients: DashMap<String, TokenBucket>,
    models: DashMap<String, TokenBucket>,
    client_default: LimitSpec,
    model_default: LimitSpec,
}

impl RateLimiter {
    pub fn new(client_default: LimitSpec, model_default: LimitSpec) -> Self {
        Self { clients: DashMap::new(), models: DashMap::new(), client_default, model_default }
    }

    /// Build from config, applying per-subject overrides.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let limiter = Self::new(config.client, config.model);
        for (client, spec) in &config.overrides.clients {
            limiter.set_limit(SubjectKind::Client, client, *spec);
        }
        for (model, spec) in &config.overrides.models {
            limiter.set_limit(SubjectKind::Model, model, *spec);
        }
        limiter
    }

    fn buckets(&self, kind: SubjectKind) -> &DashMap<String, TokenBucket> {
        match kind {
            SubjectKind::Client => &self.clients,
            SubjectKind::Model => &self.models,
        }
    }

    fn default_spec(&self, kind: SubjectKind) -> LimitSpec {
        match kind {
            SubjectKind::Client => self.client_default,
            SubjectKind::Model => self.model_default,
        }
    }

    pub fn try_acquire(&self, kind: SubjectKind, subject_id: &str, cost: f64) -> Admission {
        self.try_acquire_at(kind, subject_id, cost, Instant::now())
    }

    pub fn try_acquire_at(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        cost: f64,
        now: Instant,
    ) -> Admission {
        let spec = self.default_spec(kind);
        let mut bucket = self
            .buckets(kind)
            .entry(subject_id.to_string())
            .or_insert_with(|| TokenBucket::new(spec, now));

        match bucket.try_acquire(cost, now) {
            Ok(()) => Admission::Granted,
            Err(retry_after_secs) => {
                tracing::debug!(
                    kind = %kind,
                    subject = %subject_id,
                    retry_after_secs,
                    "Rate limit denied"
                );
                Admission::Denied { retry_after_secs }
            },
        }
    }

    fn refund(&self, kind: SubjectKind, subject_id: &str, cost: f64) {
        if let Some(mut bucket) = self.buckets(kind).get_mut(subject_id) {
            bucket.refund(cost);
        }
    }

    /// Admit a request only if both the client and the model bucket grant.
    ///
    /// A client token taken before a model denial is refunded.
    pub fn admit(&self, client_id: &str, model_id: &str, cost: f64) -> GatewayResult<()> {
        self.admit_at(client_id, model_id, cost, Instant::now())
    }

    pub fn admit_at(
        &self,
        client_id: &str,
        model_id: &str,
        cost: f64,
        now: Instant,
    ) -> GatewayResult<()> {
        if let Admission::Denied { retry_after_secs } =
            self.try_acquire_at(SubjectKind::Client, client_id, cost, now)
        {
            return Err(GatewayError::RateLimited {
                subject: format!("client:{}", client_id),
                retry_after_secs,
            });
        }

        if let Admission::Denied { retry_after_secs } =
            self.try_acquire_at(SubjectKind::Model, model_id, cost, now)
        {
            self.refund(SubjectKind::Client, client_id, cost);
            return Err(GatewayError::RateLimited {
                subject: format!("model:{}", model_id),
                retry_after_secs,
            });
        }

        Ok(())
    }

    /// Reconfigure one subject. Existing tokens are clamped, never reset to full.
    pub fn set_limit(&self, kind: SubjectKind, subject_id: &str, spec: LimitSpec) {
        self.set_limit_at(kind, subject_id, spec, Instant::now());
    }

    pub fn set_limit_at(&self, kind: SubjectKind, subject_id: &str, spec: LimitSpec, now: Instant) {
        let mut bucket = self
            .buckets(kind)
            .entry(subject_id.to_string())
            .or_insert_with(|| TokenBucket::new(spec, now));
        bucket.reconfigure(spec, now);
        bucket.pinned = true;
        tracing::info!(
            kind = %kind,
            subject = %subject_id,
            capacity = spec.capacity,
            refill_per_second = spec.refill_per_second,
            "Rate limit updated"
        );
    }

    /// Snapshot of a subject. Unknown subjects report a full default bucket
    /// without creating one.
    pub fn status(&self, kind: SubjectKind, subject_id: &str) -> RateLimitSnapshot {
        self.status_at(kind, subject_id, Instant::now())
    }

    pub fn status_at(&self, kind: SubjectKind, subject_id: &str, now: Instant) -> RateLimitSnapshot {
        let (tokens_available, capacity, refill_rate_per_second) =
            match self.buckets(kind).get(subject_id) {
                Some(bucket) => (bucket.tokens_at(now), bucket.capacity(), bucket.refill_rate()),
                None => {
                    let spec = self.default_spec(kind);
                    (f64::from(spec.capacity), spec.capacity, spec.refill_per_second)
                },
            };

        RateLimitSnapshot {
            subject_id: subject_id.to_string(),
            kind,
            tokens_available,
            capacity,
            refill_rate_per_second,
        }
    }

    /// Drop buckets that have refilled completely and carry no override.
    /// A dropped bucket is indistinguishable from a fresh default one.
    pub fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now())
    }

    pub fn prune_idle_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        for map in [&self.clients, &self.models] {
            map.retain(|_, bucket| {
                let keep = bucket.pinned || !bucket.is_full_at(now);
                if !keep {
                    removed += 1;
                }
                keep
            });
        }
        if removed > 0 {
            tracing::debug!("Pruned {} idle rate limit bucket(s)", removed);
        }
        removed
    }

    pub fn tracked_subjects(&self) -> usize {
        self.clients.len() + self.models.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
