//! Application State
//!
//! Shared state handed to every handler: the gateway pipeline plus the
//! read-only facts the HTTP layer reports about itself.

use std::sync::Arc;
use std::time::Instant;

use switchyard_core::Gateway;
use switchyard_types::models::key::ALL_MODELS;
use switchyard_types::GatewayConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub gateway: Arc<Gateway>,
    /// Model ids explicitly routed to a provider
    pub models: Vec<String>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, models: Vec<String>) -> Self {
        Self { inner: Arc::new(AppStateInner { gateway, models, started_at: Instant::now() }) }
    }

    pub fn from_config(gateway: Arc<Gateway>, config: &GatewayConfig) -> Self {
        let mut models: Vec<String> = config
            .providers
            .iter()
            .flat_map(|p| p.models.iter())
            .filter(|m| m.as_str() != ALL_MODELS)
            .cloned()
            .collect();
        models.sort();
        models.dedup();
        Self::new(gateway, models)
    }

    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    pub fn models(&self) -> &[String] {
        &self.inner.models
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
