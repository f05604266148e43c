use std::fmt;
use std::time::Instant;

/// Lifecycle of one completion request.
///
/// Both the hit and the miss path end in `Recorded`; `Rejected` is reachable
/// from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Authenticated,
    RateChecked,
    Normalized,
    CacheChecked,
    Dispatching,
    Completed,
    CacheHit,
    Recorded,
    Rejected,
}

impl RequestStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Recorded | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Authenticated => "authenticated",
            Self::RateChecked => "rate_checked",
            Self::Normalized => "normalized",
            Self::CacheChecked => "cache_checked",
            Self::Dispatching => "dispatching",
            Self::Completed => "completed",
            Self::CacheHit => "cache_hit",
            Self::Recorded => "recorded",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current stage of one request for logging.
#[derive(Debug)]
pub(crate) struct RequestTrace {
    pub request_id: String,
    pub model_id: String,
    stage: RequestStage,
    started: Instant,
}

impl RequestTrace {
    pub fn new(request_id: String, model_id: &str) -> Self {
        Self { request_id, model_id: model_id.to_string(), stage: RequestStage::Received, started: Instant::now() }
    }

    pub fn stage(&self) -> RequestStage {
        self.stage
    }

    pub fn advance(&mut self, next: RequestStage) {
        debug_assert!(!self.stage.is_terminal(), "request already finished in {}", self.stage);
        tracing::trace!(
            request_id = %self.request_id,
            from = %self.stage,
            to = %next,
            "Request stage transition"
        );
        self.stage = next;
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert!(!RequestStage::CacheHit.is_terminal());
        assert!(RequestStage::Recorded.is_terminal());
        assert!(RequestStage::Rejected.is_terminal());
        assert!(!RequestStage::Completed.is_terminal());
        assert!(!RequestStage::Dispatching.is_terminal());
    }

    #[test]
    fn test_trace_advances() {
        let mut trace = RequestTrace::new("req".into(), "m1");
        assert_eq!(trace.stage(), RequestStage::Received);
        trace.advance(RequestStage::Authenticated);
        trace.advance(RequestStage::Rejected);
        assert_eq!(trace.stage(), RequestStage::Rejected);
    }

    #[test]
    fn test_cache_hit_path_ends_recorded() {
        let mut trace = RequestTrace::new("req".into(), "m1");
        for stage in [
            RequestStage::Authenticated,
            RequestStage::RateChecked,
            RequestStage::Normalized,
            RequestStage::CacheChecked,
            RequestStage::CacheHit,
            RequestStage::Recorded,
        ] {
            trace.advance(stage);
        }
        assert_eq!(trace.stage(), RequestStage::Recorded);
        assert!(trace.stage().is_terminal());
    }
}
