//! HTTP error responses.
//!
//! Every failure is rendered as a transient banner:
//! `{ "error": "<message>", "dismissAfterMs": 3000 }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use rummageo_common::banner::Banner;
use rummageo_common::RummageoError;
use rummageo_hypothesis::HypothesisError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RummageoError> for ApiError {
    fn from(e: RummageoError) -> Self {
        match e {
            RummageoError::NotFound(_) => ApiError::NotFound("Not Found".to_string()),
            RummageoError::Http(_) | RummageoError::GraphQl(_) | RummageoError::Upstream { .. } => {
                ApiError::Upstream(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<HypothesisError> for ApiError {
    fn from(e: HypothesisError) -> Self {
        match &e {
            HypothesisError::InvalidDescription(_) => ApiError::BadRequest(e.banner_message()),
            _ => ApiError::Upstream(e.banner_message()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, "{self}");
        }
        let banner = Banner::new(self.to_string());
        let body = serde_json::json!({
            "error": banner.message,
            "dismissAfterMs": banner.ttl.as_millis() as u64,
        });
        (status, Json(body)).into_response()
    }
}
