//! Shared application state for the web server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use rummageo_common::sandbox::SandboxClient;
use rummageo_common::RummageoError;
use rummageo_hypothesis::workflow::{StudySummaries, SummarySource};
use rummageo_hypothesis::HypothesisWorkflow;
use rummageo_llm::backend::{OpenAiBackend, OpenAiCompatibleBackend};
use rummageo_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
use rummageo_query::backgrounds::BackgroundIndex;
use rummageo_query::{EnrichmentService, GraphQlClient, GraphQlExecutor};
use rummageo_sources::{EnrichrClient, EnrichrSource, G2sgClient, LiteratureSource, PubMedClient};

use crate::config::Config;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    /// Allowlisted client for proxied and outbound requests.
    pub http: SandboxClient,
    pub graphql: Arc<dyn GraphQlExecutor>,
    pub enrichment: EnrichmentService,
    pub hypothesis: HypothesisWorkflow,
    pub g2sg: G2sgClient,
    backgrounds: OnceCell<BackgroundIndex>,
}

pub type SharedState = Arc<AppState>;

/// Stand-in when no API key is configured; every completion fails.
struct MissingKeyBackend {
    model: String,
}

#[async_trait]
impl LlmBackend for MissingKeyBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::Unavailable("OPENAI_API_KEY is not set".to_string()))
    }
    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 0 }
}

fn llm_backend(config: &Config, http: &SandboxClient) -> Arc<dyn LlmBackend> {
    let llm = &config.llm;
    match (&llm.base_url, &llm.api_key) {
        (Some(base), key) => Arc::new(OpenAiCompatibleBackend::new(
            http.clone(),
            base.clone(),
            llm.model.clone(),
            key.clone(),
        )),
        (None, Some(key)) => Arc::new(OpenAiBackend::new(http.clone(), key.clone(), llm.model.clone())),
        (None, None) => {
            warn!("No LLM API key configured; hypothesis generation is disabled");
            Arc::new(MissingKeyBackend { model: llm.model.clone() })
        }
    }
}

impl AppState {
    /// Wire real clients from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let mut http = SandboxClient::with_timeout(Duration::from_secs(config.upstream.timeout_secs))?;
        for url in [
            &config.upstream.graphql_url,
            &config.upstream.graphiql_url,
            &config.upstream.download_gmt_url,
            &config.sources.enrichr_url,
            &config.sources.g2sg_url,
            &config.downloads.archive_base_url,
        ] {
            http.allow_url(url)?;
        }
        if let Some(base) = &config.llm.base_url {
            http.allow_url(base)?;
        }

        let graphql: Arc<dyn GraphQlExecutor> =
            Arc::new(GraphQlClient::new(http.clone(), config.upstream.graphql_url.clone()));
        let enrichr: Arc<dyn EnrichrSource> =
            Arc::new(EnrichrClient::with_base_url(http.clone(), config.sources.enrichr_url.clone()));
        let literature: Option<Arc<dyn LiteratureSource>> = config.sources.pubmed_fallback.then(|| {
            Arc::new(PubMedClient::new(http.clone(), config.sources.ncbi_api_key.clone())) as Arc<dyn LiteratureSource>
        });
        let summaries: Arc<dyn SummarySource> = Arc::new(StudySummaries::new(graphql.clone(), literature));
        let llm = llm_backend(&config, &http);

        info!(upstream = %config.upstream.graphql_url, model = %config.llm.model, "Clients configured");
        Ok(Self::with_clients(config, http, graphql, enrichr, llm, summaries))
    }

    /// Assemble state from already-built clients.
    pub fn with_clients(
        config: Config,
        http: SandboxClient,
        graphql: Arc<dyn GraphQlExecutor>,
        enrichr: Arc<dyn EnrichrSource>,
        llm: Arc<dyn LlmBackend>,
        summaries: Arc<dyn SummarySource>,
    ) -> Self {
        let hypothesis = HypothesisWorkflow::new(enrichr, llm, summaries, config.workflow());
        Self {
            g2sg: G2sgClient::with_base_url(http.clone(), config.sources.g2sg_url.clone()),
            enrichment: EnrichmentService::new(graphql.clone()),
            hypothesis,
            graphql,
            http,
            config,
            backgrounds: OnceCell::new(),
        }
    }

    /// Species → background id map, fetched once.
    pub async fn backgrounds(&self) -> Result<&BackgroundIndex, RummageoError> {
        self.backgrounds
            .get_or_try_init(|| BackgroundIndex::fetch(self.graphql.as_ref()))
            .await
    }
}
