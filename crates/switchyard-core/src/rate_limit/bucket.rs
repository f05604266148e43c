use std::time::Instant;

use switchyard_types::models::LimitSpec;

/// Continuous-refill token bucket. `tokens` stays within `[0, capacity]`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
    /// Set by an explicit limit override; such buckets are never pruned
    pub(super) pinned: bool,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(spec: LimitSpec, now: Instant) -> Self {
        Self {
            capacity: spec.capacity,
            refill_rate: spec.refill_per_second,
            tokens: f64::from(spec.capacity),
            last_refill: now,
            pinned: false,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Tokens as of `now` without mutating the bucket.
    pub fn tokens_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * self.refill_rate).clamp(0.0, f64::from(self.capacity))
    }

    fn refill(&mut self, now: Instant) {
        self.tokens = self.tokens_at(now);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Refill, then take `cost` tokens. On denial returns seconds until enough tokens exist.
    pub fn try_acquire(&mut self, cost: f64, now: Instant) -> Result<(), f64> {
        self.refill(now);
        if self.tokens >= cost {
            self.tokens -= cost;
            Ok(())
        } else {
            Err((cost - self.tokens) / self.refill_rate)
        }
    }

    /// Give back tokens taken by a grant that was later rolled back.
    pub fn refund(&mut self, cost: f64) {
        self.tokens = (self.tokens + cost).min(f64::from(self.capacity));
    }

    /// Apply a new limit. Accrued tokens carry over, clamped to the new capacity.
    pub fn reconfigure(&mut self, spec: LimitSpec, now: Instant) {
        self.refill(now);
        self.capacity = spec.capacity;
        self.refill_rate = spec.refill_per_second;
        self.tokens = self.tokens.min(f64::from(spec.capacity));
    }

    pub fn is_full_at(&self, now: Instant) -> bool {
        self.tokens_at(now) >= f64::from(self.capacity)
    }
}
