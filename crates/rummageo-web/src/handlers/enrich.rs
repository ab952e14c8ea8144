//! Paginated enrichment of a user gene list.
//!
//! Table state travels in the query string (`page`, `q`, `sortBy`,
//! `sortByDir`, `score`); the gene list in the JSON body, either inline or
//! as the id of a stored user gene set. Superseding is scoped to the
//! request's session, so concurrent users never cancel each other.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rummageo_common::{Species, UserGeneSet};
use rummageo_query::enrichment::{EnrichmentParams, NO_VALID_GENES};
use rummageo_query::export::enrichment_tsv;
use rummageo_query::gene_sets::{add_user_gene_set, fetch_user_gene_set};
use rummageo_query::gmt;
use rummageo_query::rows::EnrichmentRow;
use rummageo_query::{EnrichmentQueryState, QueryOutcome};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    #[serde(default)]
    pub genes: Vec<String>,
    /// Stored user gene set to enrich instead of `genes`.
    #[serde(default)]
    pub dataset: Option<String>,
    /// Client session; newer fetches supersede older ones within it. When
    /// absent the dataset id or the gene list itself scopes the fetch.
    #[serde(default)]
    pub session: Option<String>,
}

impl EnrichRequest {
    pub fn session_key(&self) -> String {
        if let Some(session) = self.session.as_deref().filter(|s| !s.is_empty()) {
            return format!("session:{session}");
        }
        if let Some(id) = &self.dataset {
            return format!("dataset:{id}");
        }
        let mut genes: Vec<&str> = self.genes.iter().map(|g| g.trim()).collect();
        genes.sort_unstable();
        genes.dedup();
        format!("genes:{}", genes.join(","))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichStatus {
    Skipped,
    Loaded,
    Superseded,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichResponse {
    pub status: EnrichStatus,
    pub species: Option<Species>,
    pub query: EnrichmentQueryState,
    pub query_string: String,
    pub total_count: u64,
    pub page_count: u64,
    pub rows: Vec<EnrichmentRow>,
    pub enriched_terms: Vec<String>,
    pub top_enriched_sigs: Vec<String>,
}

impl EnrichResponse {
    fn empty(status: EnrichStatus, query: EnrichmentQueryState, species: Option<Species>) -> Self {
        Self {
            status,
            species,
            query_string: query.to_query_string(),
            query,
            total_count: 0,
            page_count: 1,
            rows: vec![],
            enriched_terms: vec![],
            top_enriched_sigs: vec![],
        }
    }
}

async fn resolve_genes(state: &SharedState, req: &EnrichRequest) -> Result<Vec<String>, ApiError> {
    match &req.dataset {
        Some(id) => Ok(fetch_user_gene_set(state.graphql.as_ref(), id).await?.valid_genes()),
        None => Ok(UserGeneSet { genes: req.genes.clone(), description: None }.valid_genes()),
    }
}

async fn run(state: &SharedState, params: &EnrichmentParams, req: &EnrichRequest) -> Result<EnrichResponse, ApiError> {
    let query = EnrichmentQueryState::from_params(params);
    let genes = resolve_genes(state, req).await?;
    if genes.is_empty() {
        return Ok(EnrichResponse::empty(EnrichStatus::Skipped, query, None));
    }

    let species = Species::from_genes(&genes);
    let background_id = state.backgrounds().await?.id_for(species)?.to_string();
    debug!(%species, n_genes = genes.len(), "Running enrichment");

    let session = req.session_key();
    match state.enrichment.fetch(&session, &genes, &background_id, &query).await {
        QueryOutcome::Loaded(page) => Ok(EnrichResponse {
            status: EnrichStatus::Loaded,
            species: Some(species),
            query_string: query.to_query_string(),
            query,
            total_count: page.total_count,
            page_count: page.page_count(),
            rows: page.row_views(),
            enriched_terms: page.enriched_terms,
            top_enriched_sigs: page.top_enriched_sigs,
        }),
        QueryOutcome::Failed(_) => Err(ApiError::BadRequest(NO_VALID_GENES.to_string())),
        QueryOutcome::Superseded => Ok(EnrichResponse::empty(EnrichStatus::Superseded, query, Some(species))),
        QueryOutcome::Skipped | QueryOutcome::Loading => {
            Ok(EnrichResponse::empty(EnrichStatus::Skipped, query, Some(species)))
        }
    }
}

/// POST /api/enrich
pub async fn enrich(
    State(state): State<SharedState>,
    Query(params): Query<EnrichmentParams>,
    Json(req): Json<EnrichRequest>,
) -> Result<Json<EnrichResponse>, ApiError> {
    Ok(Json(run(&state, &params, &req).await?))
}

/// POST /api/enrich/download: the requested page as TSV.
pub async fn enrich_download(
    State(state): State<SharedState>,
    Query(params): Query<EnrichmentParams>,
    Json(req): Json<EnrichRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let page = run(&state, &params, &req).await?;
    let tsv = enrichment_tsv(&page.rows)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/tab-separated-values"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"enrichment.tsv\""),
        ],
        tsv,
    ))
}


#[derive(Debug, Deserialize)]
pub struct UserGeneSetBody {
    pub genes: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/user-gene-set: store a gene list and return its id.
pub async fn add_user_gene_set_handler(
    State(state): State<SharedState>,
    Json(body): Json<UserGeneSetBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserGeneSet { genes: body.genes, description: body.description };
    if user.valid_genes().is_empty() {
        return Err(ApiError::BadRequest(NO_VALID_GENES.to_string()));
    }
    let id = add_user_gene_set(state.graphql.as_ref(), &user).await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// POST /api/user-gene-set/gmt: store the first entry of a GMT upload.
/// The entry's description, or its term when that is blank, describes the set.
pub async fn upload_user_gene_set_gmt(
    State(state): State<SharedState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let entries = gmt::parse(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let Some(entry) = entries.into_iter().next() else {
        return Err(ApiError::BadRequest(NO_VALID_GENES.to_string()));
    };
    let description = if entry.description.trim().is_empty() { entry.term } else { entry.description };
    let user = UserGeneSet { genes: entry.genes, description: Some(description) };
    if user.valid_genes().is_empty() {
        return Err(ApiError::BadRequest(NO_VALID_GENES.to_string()));
    }
    let id = add_user_gene_set(state.graphql.as_ref(), &user).await?;
    Ok(Json(serde_json::json!({ "id": id })))
}
