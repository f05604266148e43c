//! API key management handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use switchyard_types::{ApiKeyRecord, ApiKeySummary, Permission};

use super::auth::Caller;
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub owner: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub allowed_models: Option<Vec<String>>,
    /// Requests per minute for the new key's owner
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeactivateKeyRequest {
    pub key: String,
}

/// Secrets are masked; the full key is only returned once, on creation.
pub async fn list_keys(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<Vec<ApiKeySummary>>> {
    let keys = state.gateway().list_api_keys(&caller)?;
    Ok(Json(keys.iter().map(ApiKeySummary::from).collect()))
}

pub async fn create_key(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<CreateKeyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiKeyRecord>)> {
    let Json(req) = payload?;
    let record =
        state.gateway().create_api_key(&caller, &req.owner, req.permissions, req.allowed_models, req.rate_limit)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn deactivate_key(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<DeactivateKeyRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    state.gateway().deactivate_api_key(&caller, &req.key)?;
    Ok(Json(json!({ "deactivated": true })))
}
