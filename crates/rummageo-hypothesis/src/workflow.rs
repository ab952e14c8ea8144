//! Hypothesis generation state machine.
//!
//! ```text
//! Idle ──submit──▶ Fetching ──▶ Composing ──▶ Annotating ──▶ Done
//!   ▲                  │             │              │
//!   └──── error banner ┴─────────────┴──────────────┘
//! ```
//!
//! Every external call is bounded by `step_timeout`. Nothing is retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use rummageo_common::banner::Banner;
use rummageo_common::term::{split_multi, TermParts};
use rummageo_common::RummageoError;
use rummageo_llm::audit::LlmAuditEntry;
use rummageo_llm::LlmBackend;
use rummageo_query::gene_sets::gse_summary;
use rummageo_query::GraphQlExecutor;
use rummageo_sources::enrichr::HYPOTHESIS_LIBRARIES;
use rummageo_sources::{EnrichrSource, LiteratureSource};

use crate::annotate::{annotate, strip_tags};
use crate::cache::{HypothesisCache, DEFAULT_CAPACITY};
use crate::enriched::{bounded, collect, EnrichedTerms};
use crate::error::HypothesisError;
use crate::prompt::{completion_request, PromptInput};
use crate::validation::validate_description;

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub libraries: Vec<String>,
    pub top_terms: usize,
    /// Pause after every Enrichr library request.
    pub library_delay: Duration,
    pub step_timeout: Duration,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub cache_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            libraries: HYPOTHESIS_LIBRARIES.iter().map(|l| l.to_string()).collect(),
            top_terms: 3,
            library_delay: Duration::from_millis(500),
            step_timeout: Duration::from_secs(60),
            model: "gpt-4o".to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Fetching,
    Composing,
    Annotating,
    Done,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisRequest {
    /// Signature term the user's gene set overlaps.
    pub term: String,
    #[serde(default)]
    pub description: String,
    /// Overlapping genes between the user list and the signature.
    #[serde(default)]
    pub genes: Vec<String>,
    /// GEO series for the study abstract; derived from the term when absent.
    #[serde(default)]
    pub gse: Option<String>,
    #[serde(default)]
    pub pmids: Vec<String>,
}

impl HypothesisRequest {
    pub fn gse(&self) -> String {
        self.gse
            .clone()
            .filter(|g| !g.is_empty())
            .or_else(|| split_multi(&TermParts::parse(&self.term).gse).into_iter().next())
            .unwrap_or_default()
    }

    /// Cache key over everything the answer depends on: the term, the
    /// description and the gene set (order and duplicates ignored).
    pub fn cache_key(&self) -> String {
        let mut genes: Vec<&str> = self.genes.iter().map(|g| g.trim()).filter(|g| !g.is_empty()).collect();
        genes.sort_unstable();
        genes.dedup();

        let mut hasher = Sha256::new();
        hasher.update(self.term.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.description.trim().as_bytes());
        hasher.update([0u8]);
        hasher.update(genes.join("\n").as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    /// Cache key of the request that produced it.
    pub key: String,
    pub term: String,
    /// Model output with enriched terms wrapped in tooltip spans.
    pub html: String,
    pub plain_text: String,
    pub enriched: EnrichedTerms,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

// ── Study abstracts ──────────────────────────────────────────────────────────

/// Where the GEO study abstract comes from.
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn summary(&self, gse: &str, pmids: &[String]) -> Result<String, RummageoError>;
}

/// GSE summary from the GraphQL API, falling back to the first PubMed
/// abstract when the series has none.
pub struct StudySummaries {
    graphql: Arc<dyn GraphQlExecutor>,
    literature: Option<Arc<dyn LiteratureSource>>,
}

impl StudySummaries {
    pub fn new(graphql: Arc<dyn GraphQlExecutor>, literature: Option<Arc<dyn LiteratureSource>>) -> Self {
        Self { graphql, literature }
    }
}

#[async_trait]
impl SummarySource for StudySummaries {
    async fn summary(&self, gse: &str, pmids: &[String]) -> Result<String, RummageoError> {
        let summary = if gse.is_empty() {
            String::new()
        } else {
            gse_summary(self.graphql.as_ref(), gse).await?
        };
        if !summary.trim().is_empty() || pmids.is_empty() {
            return Ok(summary);
        }
        let Some(literature) = &self.literature else {
            return Ok(summary);
        };
        match literature.first_abstract(pmids).await {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Ok(summary),
            Err(e) => {
                warn!(gse, "PubMed fallback failed: {e}");
                Ok(summary)
            }
        }
    }
}

// ── Workflow ─────────────────────────────────────────────────────────────────

pub struct HypothesisWorkflow {
    enrichr: Arc<dyn EnrichrSource>,
    llm: Arc<dyn LlmBackend>,
    summaries: Arc<dyn SummarySource>,
    cache: HypothesisCache,
    config: WorkflowConfig,
}

impl HypothesisWorkflow {
    pub fn new(
        enrichr: Arc<dyn EnrichrSource>,
        llm: Arc<dyn LlmBackend>,
        summaries: Arc<dyn SummarySource>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            cache: HypothesisCache::new(config.cache_capacity),
            enrichr,
            llm,
            summaries,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn cached(&self, key: &str) -> Option<Arc<Hypothesis>> {
        self.cache.get(key).await
    }

    /// Run the workflow, reporting each state entered to `observe`.
    ///
    /// Returns `Ok(None)` for an empty term. A cached hypothesis for the same
    /// term, description and genes is returned as is, without network calls.
    #[instrument(skip(self, req, observe), fields(term = %req.term))]
    pub async fn generate(
        &self,
        req: &HypothesisRequest,
        observe: &mut (dyn FnMut(WorkflowState) + Send),
    ) -> Result<Option<Arc<Hypothesis>>, HypothesisError> {
        let key = req.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            info!("Hypothesis served from cache");
            observe(WorkflowState::Done);
            return Ok(Some(hit));
        }

        validate_description(&req.description)?;
        if req.term.is_empty() {
            return Ok(None);
        }
        let limit = self.config.step_timeout;

        observe(WorkflowState::Fetching);
        let enriched = collect(
            self.enrichr.as_ref(),
            &req.genes,
            &self.config.libraries,
            self.config.top_terms,
            self.config.library_delay,
            limit,
        )
        .await?;
        let summary = bounded(
            "Study summary",
            limit,
            self.summaries.summary(&req.gse(), &req.pmids),
            HypothesisError::Summary,
        )
        .await?;

        observe(WorkflowState::Composing);
        let input = PromptInput {
            term: &req.term,
            gse_summary: &summary,
            user_description: &req.description,
            enriched: &enriched,
        };
        let request = completion_request(
            &input,
            &self.config.model,
            self.config.max_tokens,
            self.config.temperature,
        );
        let started = Instant::now();
        let response = bounded("Hypothesis generation", limit, self.llm.complete(request), HypothesisError::Llm).await?;
        LlmAuditEntry::new(&req.term, &response, started.elapsed().as_millis() as u64).record();

        observe(WorkflowState::Annotating);
        let html = annotate(&response.content, &enriched.stats);
        let hypothesis = Arc::new(Hypothesis {
            key: key.clone(),
            term: req.term.clone(),
            plain_text: strip_tags(&html),
            html,
            enriched,
            model: response.model,
            generated_at: Utc::now(),
        });

        self.cache.insert(key, hypothesis.clone()).await;
        observe(WorkflowState::Done);
        info!("Hypothesis generated");
        Ok(Some(hypothesis))
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// One user's view of the workflow for a single selected signature.
#[derive(Debug, Clone)]
pub struct HypothesisSession {
    pub term: String,
    pub state: WorkflowState,
    pub banner: Option<Banner>,
    pub result: Option<Arc<Hypothesis>>,
    /// States entered during the last submission.
    pub history: Vec<WorkflowState>,
}

impl HypothesisSession {
    /// Open the session. `key` is the cache key of this user's earlier
    /// result for the term; a live cache entry puts the session straight
    /// into `Done`.
    pub async fn open(workflow: &HypothesisWorkflow, term: impl Into<String>, key: Option<&str>) -> Self {
        let term = term.into();
        let result = match key {
            Some(key) => workflow.cached(key).await.filter(|h| h.term == term),
            None => None,
        };
        Self {
            state: if result.is_some() { WorkflowState::Done } else { WorkflowState::Idle },
            term,
            banner: None,
            result,
            history: Vec::new(),
        }
    }

    pub async fn submit(
        &mut self,
        workflow: &HypothesisWorkflow,
        description: &str,
        genes: Vec<String>,
    ) -> Result<Option<Arc<Hypothesis>>, HypothesisError> {
        let req = HypothesisRequest {
            term: self.term.clone(),
            description: description.to_string(),
            genes,
            ..Default::default()
        };
        self.history.clear();
        self.banner = None;

        let history = &mut self.history;
        let outcome = workflow.generate(&req, &mut |s| history.push(s)).await;
        match &outcome {
            Ok(Some(h)) => {
                self.state = WorkflowState::Done;
                self.result = Some(h.clone());
            }
            Ok(None) => self.state = WorkflowState::Idle,
            Err(e) => {
                self.state = WorkflowState::Idle;
                self.banner = Some(Banner::new(e.banner_message()));
            }
        }
        outcome
    }

    /// Banner currently on screen, if it has not expired.
    pub fn visible_banner(&self) -> Option<&Banner> {
        self.banner.as_ref().filter(|b| b.is_visible())
    }
}
