//! Completion and model listing handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use switchyard_types::{CompletionOptions, CompletionResponse, DecodingParams, RawMessage};

use super::auth::{ApiKey, Caller};
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(flatten)]
    pub params: DecodingParams,
    #[serde(flatten)]
    pub options: CompletionOptions,
}

pub async fn create_completion(
    State(state): State<AppState>,
    ApiKey(key): ApiKey,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> ApiResult<Json<CompletionResponse>> {
    // Credentials are checked before the body is looked at
    state.gateway().authenticate(&key)?;
    let Json(request) = payload?;
    let response = state
        .gateway()
        .handle_completion_with(&key, &request.messages, &request.model, &request.params, &request.options)
        .await?;
    Ok(Json(response))
}

/// Models the caller's key may use among those routed to a provider.
pub async fn list_models(State(state): State<AppState>, Caller(caller): Caller) -> Json<Value> {
    let models: Vec<Value> = state
        .models()
        .iter()
        .filter(|id| caller.allows_model(id))
        .map(|id| json!({ "id": id, "object": "model" }))
        .collect();
    Json(json!({ "object": "list", "data": models }))
}
