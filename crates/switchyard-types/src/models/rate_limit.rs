//! Rate limit models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family of bucket a subject belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    #[default]
    Client,
    Model,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Client => write!(f, "client"),
            SubjectKind::Model => write!(f, "model"),
        }
    }
}

/// Read-only view of one bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSnapshot {
    pub subject_id: String,
    pub kind: SubjectKind,
    pub tokens_available: f64,
    pub capacity: u32,
    pub refill_rate_per_second: f64,
}
