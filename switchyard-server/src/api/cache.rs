use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use super::auth::Caller;
use super::error::ApiResult;
use crate::state::AppState;

pub async fn get_cache_stats(State(state): State<AppState>, Caller(_caller): Caller) -> Json<Value> {
    let stats = state.gateway().get_cache_stats();
    Json(json!({
        "entry_count": stats.entry_count,
        "total_hits": stats.total_hits,
        "total_misses": stats.total_misses,
        "hit_ratio": stats.hit_ratio(),
    }))
}

pub async fn clear_cache(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Value>> {
    let cleared = state.gateway().clear_cache(&caller)?;
    Ok(Json(json!({ "cleared": cleared })))
}
