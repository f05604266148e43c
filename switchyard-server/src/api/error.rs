//! HTTP rendering of gateway errors.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use switchyard_types::GatewayError;

/// A [`GatewayError`] on its way out as an HTTP response.
///
/// Body: `{"error": {"type": kind, "message": ..., "retry_after_secs"?: f64}}`.
/// Rate limited responses also carry `Retry-After` in whole seconds.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(GatewayError::invalid_input(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(GatewayError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut error = json!({
            "type": self.0.kind(),
            "message": self.0.to_string(),
        });
        let retry_after = self.0.retry_after_secs();
        if let Some(secs) = retry_after {
            error["retry_after_secs"] = json!(secs);
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();
        if let Some(secs) = retry_after {
            let whole = secs.max(0.0).ceil() as u64;
            if let Ok(value) = HeaderValue::from_str(&whole.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
