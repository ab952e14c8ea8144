//! Term-enrichment tables for an enrichment result set.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use rummageo_common::Species;
use rummageo_query::terms::{
    fetch_enrichr_stats, fetch_enrichr_terms, fetch_key_terms, EnrichrStatRow, TermColumn, TermSource,
    TermTable, TermTablePage, ALL_SOURCES,
};
use rummageo_query::SortDirection;

use crate::error::ApiError;
use crate::state::SharedState;

fn default_page() -> usize { 1 }

fn default_source_type() -> String { ALL_SOURCES.to_string() }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermTableRequest {
    /// Enriched signature terms from the enrichment page.
    #[serde(default)]
    pub terms: Vec<String>,
    pub species: Species,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default)]
    pub sort_by: Option<TermColumn>,
    #[serde(default)]
    pub sort_dir: SortDirection,
}

async fn build_table(state: &SharedState, req: &TermTableRequest, source: TermSource) -> Result<TermTable, ApiError> {
    let exec = state.graphql.as_ref();
    let rows = match source {
        TermSource::KeyTerms => fetch_key_terms(exec, &req.terms, &req.source_type, req.species).await?,
        TermSource::Enrichr => fetch_enrichr_terms(exec, &req.terms, req.species).await?,
    };
    let mut table = TermTable::new(rows, source);
    if let Some(column) = req.sort_by {
        table.sort_by(column, req.sort_dir);
    }
    table.set_search(req.search.clone());
    table.set_page(req.page);
    Ok(table)
}

/// POST /api/enrich/terms - key terms over the enriched signatures
pub async fn key_terms(
    State(state): State<SharedState>,
    Json(req): Json<TermTableRequest>,
) -> Result<Json<TermTablePage>, ApiError> {
    let table = build_table(&state, &req, TermSource::KeyTerms).await?;
    Ok(Json(table.current_page()))
}

/// POST /api/enrich/enrichr-terms - Enrichr library terms over the top signatures
pub async fn enrichr_terms(
    State(state): State<SharedState>,
    Json(req): Json<TermTableRequest>,
) -> Result<Json<TermTablePage>, ApiError> {
    let table = build_table(&state, &req, TermSource::Enrichr).await?;
    Ok(Json(table.current_page()))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub source: Option<TermSource>,
}

/// POST /api/enrich/terms/download?source=enrichr - filtered table as TSV
pub async fn download_terms(
    State(state): State<SharedState>,
    Query(params): Query<DownloadParams>,
    Json(req): Json<TermTableRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source = params.source.unwrap_or(TermSource::KeyTerms);
    let table = build_table(&state, &req, source).await?;
    let filename = match source {
        TermSource::KeyTerms => "key_terms.tsv",
        TermSource::Enrichr => "enrichr_terms.tsv",
    };
    Ok((
        [
            (header::CONTENT_TYPE, "text/tab-separated-values".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        table.to_tsv()?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct EnrichrStatsParams {
    pub sig: String,
}

/// GET /api/enrichr-stats?sig= - significant precomputed Enrichr terms for one signature
pub async fn enrichr_stats(
    State(state): State<SharedState>,
    Query(params): Query<EnrichrStatsParams>,
) -> Result<Json<Vec<EnrichrStatRow>>, ApiError> {
    if params.sig.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing signature".to_string()));
    }
    Ok(Json(fetch_enrichr_stats(state.graphql.as_ref(), params.sig.trim()).await?))
}
