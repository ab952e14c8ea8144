//! Pass-through to the upstream GraphQL service.
//!
//! `/graphql`, `/graphiql` and `/download.gmt` are forwarded verbatim; only
//! the content headers come back.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::ApiError;
use crate::state::SharedState;

const FORWARDED_HEADERS: [header::HeaderName; 2] = [header::CONTENT_TYPE, header::CONTENT_DISPOSITION];

async fn forward(
    state: &SharedState,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let mut req = state.http.request(method, url)?;
    if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        req = req.header(reqwest::header::CONTENT_TYPE, ct);
    }
    if !body.is_empty() {
        req = req.body(body.to_vec());
    }

    let upstream = req.send().await.map_err(rummageo_common::RummageoError::from)?;
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    debug!(%url, %status, "Proxied upstream request");

    let mut out = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(v) = upstream
            .headers()
            .get(name.as_str())
            .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        {
            out.insert(name, v);
        }
    }
    let bytes = upstream.bytes().await.map_err(rummageo_common::RummageoError::from)?;
    Ok((status, out, bytes.to_vec()).into_response())
}

/// POST /graphql
pub async fn graphql(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let url = state.config.upstream.graphql_url.clone();
    forward(&state, Method::POST, &url, &headers, body).await
}

/// GET|POST /graphiql
pub async fn graphiql(
    State(state): State<SharedState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let url = state.config.upstream.graphiql_url.clone();
    forward(&state, method, &url, &headers, body).await
}

/// GET /download.gmt - the full signature library
pub async fn download_gmt(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let url = state.config.upstream.download_gmt_url.clone();
    forward(&state, Method::GET, &url, &headers, Bytes::new()).await
}
