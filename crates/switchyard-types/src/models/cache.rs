//! Cache statistics.

use serde::{Deserialize, Serialize};

/// Cache counters. `entry_count` includes entries not yet lazily evicted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_hits: u64,
    pub total_misses: u64,
}

impl CacheStats {
    /// Hit ratio across all lookups, 0.0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.total_hits + self.total_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.total_hits as f64 / lookups as f64
    }
}
