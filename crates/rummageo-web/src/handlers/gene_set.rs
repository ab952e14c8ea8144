//! Gene-set views, overlap, term search and G2SG hand-off.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use rummageo_common::{GeneSet, RummageoError};
use rummageo_query::gene_sets::{fetch_user_gene_set, overlap, term_search, view_gene_set, TermSearchResults};
use rummageo_query::gmt::{self, GmtEntry};

use crate::error::ApiError;
use crate::state::SharedState;

/// GET /api/gene-set/{id}
pub async fn gene_set(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GeneSet>, ApiError> {
    Ok(Json(view_gene_set(state.graphql.as_ref(), &id).await?))
}

/// GET /api/gene-set/{id}/download.gmt - one signature as a GMT line
pub async fn gene_set_gmt(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let gene_set = view_gene_set(state.graphql.as_ref(), &id).await?;
    let entry = GmtEntry {
        genes: gene_set.symbols(),
        term: gene_set.term,
        description: String::new(),
    };
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}.gmt\"", entry.term)),
        ],
        gmt::write(&[entry]),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OverlapRequest {
    pub genes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OverlapResponse {
    pub id: String,
    pub overlap: Vec<String>,
}

/// POST /api/gene-set/{id}/overlap - genes shared with the user list
pub async fn gene_set_overlap(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<OverlapRequest>,
) -> Result<Json<OverlapResponse>, ApiError> {
    let genes = overlap(state.graphql.as_ref(), &id, &req.genes).await?;
    Ok(Json(OverlapResponse { id, overlap: genes }))
}

/// GET /api/user-gene-set/{id}
pub async fn user_gene_set(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(fetch_user_gene_set(state.graphql.as_ref(), &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct TermSearchParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/term-search?q= - signatures whose term contains every word
pub async fn search_terms(
    State(state): State<SharedState>,
    Query(params): Query<TermSearchParams>,
) -> Result<Json<TermSearchResults>, ApiError> {
    Ok(Json(term_search(state.graphql.as_ref(), &params.q).await?))
}

/// GET /gene_set/{id}/submit/g2sg
///
/// Redirects to the G2SG analysis page. An unknown gene set is a 404 and a
/// failed registration a 500.
pub async fn submit_g2sg(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    let gs = match view_gene_set(state.graphql.as_ref(), &id).await {
        Ok(gs) => gs,
        Err(RummageoError::NotFound(_)) => return Err(ApiError::NotFound("Not Found".to_string())),
        Err(e) => return Err(e.into()),
    };
    let genes = gs.symbols();
    match state.g2sg.register(&gs.term, &genes, &gs.term).await {
        Ok(url) => Ok(Redirect::temporary(&url)),
        Err(e) => {
            warn!(gene_set = %id, "G2SG registration failed: {e}");
            Err(ApiError::Internal("Failed to Register Gene Set".to_string()))
        }
    }
}
