//! LLM hypothesis generation for one enriched signature.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use rummageo_hypothesis::{Hypothesis, HypothesisRequest, WorkflowState};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisResponse {
    pub term: String,
    /// States entered, in order.
    pub states: Vec<WorkflowState>,
    pub hypothesis: Option<Hypothesis>,
}

/// POST /api/hypothesis - validate, fetch context, prompt and annotate
pub async fn generate_hypothesis(
    State(state): State<SharedState>,
    Json(req): Json<HypothesisRequest>,
) -> Result<Json<HypothesisResponse>, ApiError> {
    let mut states = Vec::new();
    let mut observe = |s: WorkflowState| {
        debug!(state = ?s, "Hypothesis workflow");
        states.push(s);
    };
    let hypothesis = state.hypothesis.generate(&req, &mut observe).await?;
    Ok(Json(HypothesisResponse {
        term: req.term,
        states,
        hypothesis: hypothesis.as_deref().cloned(),
    }))
}

/// GET /api/hypothesis/{key} - a previously generated hypothesis, by the
/// `key` returned when it was generated
pub async fn cached_hypothesis(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<HypothesisResponse>, ApiError> {
    match state.hypothesis.cached(&key).await {
        Some(hit) => Ok(Json(HypothesisResponse {
            term: hit.term.clone(),
            states: vec![WorkflowState::Done],
            hypothesis: Some(Hypothesis::clone(&hit)),
        })),
        None => Err(ApiError::NotFound("Not Found".to_string())),
    }
}
