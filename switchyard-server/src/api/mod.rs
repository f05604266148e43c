//! API Routes
//!
//! HTTP endpoints mapped onto the gateway operations.

mod auth;
mod cache;
mod completions;
mod error;
mod keys;
mod rate_limits;
mod usage;

#[cfg(test)]
mod tests;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Completions
        .route("/v1/completions", post(completions::create_completion))
        .route("/v1/models", get(completions::list_models))
        // Usage
        .route("/usage", get(usage::get_usage))
        .route("/usage/models", get(usage::get_usage_by_model))
        .route("/usage/report", get(usage::get_usage_report))
        .route("/usage/reset", post(usage::reset_usage))
        // Cache
        .route("/cache/stats", get(cache::get_cache_stats))
        .route("/cache/clear", post(cache::clear_cache))
        // Rate limits
        .route("/rate-limits", get(rate_limits::get_rate_limit_status))
        .route("/rate-limits/client", post(rate_limits::set_client_rate_limit))
        .route("/rate-limits/model", post(rate_limits::set_model_rate_limit))
        // Keys
        .route("/auth/keys", get(keys::list_keys).post(keys::create_key))
        .route("/auth/keys/deactivate", post(keys::deactivate_key))
}
