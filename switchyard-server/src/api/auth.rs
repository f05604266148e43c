//! API key extraction.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header;
use axum::http::request::Parts;
use serde::Deserialize;

use switchyard_types::{ApiKeyRecord, GatewayError};

use super::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Deserialize)]
struct KeyQuery {
    api_key: Option<String>,
}

/// The raw key a request presented, from `X-API-Key`, `Authorization: Bearer`
/// or `?api_key=`, in that order.
pub struct ApiKey(pub String);

pub(crate) fn extract_api_key(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.trim().to_string());

    from_header
        .or_else(|| Query::<KeyQuery>::try_from_uri(&parts.uri).ok().and_then(|q| q.0.api_key))
        .filter(|k| !k.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        extract_api_key(parts)
            .map(ApiKey)
            .ok_or_else(|| GatewayError::unauthorized("missing API key").into())
    }
}

/// An authenticated caller.
pub struct Caller(pub ApiKeyRecord);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ApiKey(key) = ApiKey::from_request_parts(parts, state).await?;
        Ok(Caller(state.gateway().authenticate(&key)?))
    }
}
