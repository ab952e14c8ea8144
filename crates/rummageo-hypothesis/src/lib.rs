//! rummageo-hypothesis - LLM hypotheses for why a user gene set overlaps a
//! RummaGEO signature.
//!
//! Flow: validate the user's description, enrich the overlapping genes with
//! Enrichr, compose a prompt with the study abstract, ask the model, then
//! annotate enriched terms in the answer. Results are cached per signature.

pub mod error;
pub mod validation;
pub mod enriched;
pub mod prompt;
pub mod annotate;
pub mod cache;
pub mod workflow;

pub use error::HypothesisError;
pub use workflow::{Hypothesis, HypothesisRequest, HypothesisSession, HypothesisWorkflow, WorkflowConfig, WorkflowState};
