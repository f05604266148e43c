//! Usage handlers

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use switchyard_types::{UsageReport, UsageTotals};

use super::auth::Caller;
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub client_id: Option<String>,
    /// RFC 3339 lower bound on record timestamps
    pub since: Option<DateTime<Utc>>,
}

pub async fn get_usage(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> ApiResult<Json<UsageTotals>> {
    let Query(query) = query?;
    let totals = state.gateway().get_usage(&caller, query.client_id.as_deref(), query.since)?;
    Ok(Json(totals))
}

pub async fn get_usage_by_model(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> ApiResult<Json<BTreeMap<String, UsageTotals>>> {
    let Query(query) = query?;
    Ok(Json(state.gateway().get_usage_by_model(&caller, query.since)?))
}

pub async fn get_usage_report(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> ApiResult<Json<UsageReport>> {
    let Query(query) = query?;
    Ok(Json(state.gateway().get_usage_report(&caller, query.since)?))
}

pub async fn reset_usage(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Value>> {
    let removed = state.gateway().reset_usage(&caller)?;
    Ok(Json(json!({ "removed": removed })))
}
