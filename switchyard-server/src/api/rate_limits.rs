//! Rate limit handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use switchyard_types::models::SubjectKind;
use switchyard_types::{GatewayError, RateLimitSnapshot};

use super::auth::Caller;
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub kind: SubjectKind,
    /// Defaults to the caller's own client id for client buckets
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetLimitRequest {
    pub id: String,
    pub capacity: u32,
    pub refill_per_second: f64,
}

pub async fn get_rate_limit_status(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Json<RateLimitSnapshot>> {
    let Query(query) = query?;
    let subject = match (query.subject, query.kind) {
        (Some(subject), _) => subject,
        (None, SubjectKind::Client) => caller.client_id().to_string(),
        (None, SubjectKind::Model) => {
            return Err(GatewayError::invalid_input("subject is required for model buckets").into())
        },
    };
    Ok(Json(state.gateway().get_rate_limit_status(&caller, query.kind, &subject)?))
}

pub async fn set_client_rate_limit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<SetLimitRequest>, JsonRejection>,
) -> ApiResult<Json<RateLimitSnapshot>> {
    let Json(req) = payload?;
    let snapshot = state.gateway().set_client_rate_limit(&caller, &req.id, req.capacity, req.refill_per_second)?;
    Ok(Json(snapshot))
}

pub async fn set_model_rate_limit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<SetLimitRequest>, JsonRejection>,
) -> ApiResult<Json<RateLimitSnapshot>> {
    let Json(req) = payload?;
    let snapshot = state.gateway().set_model_rate_limit(&caller, &req.id, req.capacity, req.refill_per_second)?;
    Ok(Json(snapshot))
}
