//! Paginated enrichment of a user gene list against the signature library.
//!
//! The query state mirrors what the results page keeps in its URL
//! (`page`, `q`, `sortBy`, `sortByDir`) plus the silhouette-score filter.
//! Every fetch is tagged with a generation number scoped to the caller's
//! session; a response that comes back after the same session issued a
//! newer fetch is reported as superseded. Other sessions never interfere.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

use rummageo_common::entities::EnrichmentResult;
use rummageo_common::error::Result;

use crate::documents::ENRICHMENT_QUERY;
use crate::graphql::{query, GraphQlExecutor};
use crate::rows::EnrichmentRow;

/// Rows per results page.
pub const PAGE_SIZE: u32 = 8;

/// Shown in place of the table whenever the enrichment query fails.
pub const NO_VALID_GENES: &str = "No valid genes identified";

/// Silhouette-score filter value meaning "no filter".
pub const NO_SCORE_FILTER: f64 = -1.0;

// ── Sorting ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Pvalue,
    AdjPvalue,
    OddsRatio,
    NOverlap,
    Size,
    SilhouetteScore,
    Direction,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Pvalue => "pvalue",
            SortColumn::AdjPvalue => "adj_pvalue",
            SortColumn::OddsRatio => "odds_ratio",
            SortColumn::NOverlap => "n_overlap",
            SortColumn::Size => "size",
            SortColumn::SilhouetteScore => "silhouette_score",
            SortColumn::Direction => "direction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pvalue" => SortColumn::Pvalue,
            "adj_pvalue" => SortColumn::AdjPvalue,
            "odds_ratio" => SortColumn::OddsRatio,
            "n_overlap" => SortColumn::NOverlap,
            "size" => SortColumn::Size,
            "silhouette_score" => SortColumn::SilhouetteScore,
            "direction" => SortColumn::Direction,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

// ── Query state ──────────────────────────────────────────────────────────────

/// Raw URL parameters of the results page. Unparseable values fall back to
/// the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentParams {
    pub page: Option<String>,
    pub q: Option<String>,
    pub sort_by: Option<String>,
    pub sort_by_dir: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentQueryState {
    pub page: u32,
    pub term: String,
    pub sort_by: SortColumn,
    pub sort_dir: SortDirection,
    pub score_filter: f64,
}

impl Default for EnrichmentQueryState {
    fn default() -> Self {
        Self {
            page: 1,
            term: String::new(),
            sort_by: SortColumn::default(),
            sort_dir: SortDirection::default(),
            score_filter: NO_SCORE_FILTER,
        }
    }
}

impl EnrichmentQueryState {
    pub fn from_params(params: &EnrichmentParams) -> Self {
        let defaults = Self::default();
        Self {
            page: params
                .page
                .as_deref()
                .and_then(|p| p.parse::<u32>().ok())
                .filter(|p| *p >= 1)
                .unwrap_or(defaults.page),
            term: params.q.clone().unwrap_or_default(),
            sort_by: params
                .sort_by
                .as_deref()
                .and_then(SortColumn::parse)
                .unwrap_or(defaults.sort_by),
            sort_dir: params
                .sort_by_dir
                .as_deref()
                .and_then(SortDirection::parse)
                .unwrap_or(defaults.sort_dir),
            score_filter: params.score.unwrap_or(defaults.score_filter),
        }
    }

    /// Parse a `page=2&q=liver&sortBy=odds_ratio&sortByDir=desc` query string.
    pub fn from_query_string(qs: &str) -> Self {
        let mut params = EnrichmentParams::default();
        for (key, value) in form_urlencoded::parse(qs.trim_start_matches('?').as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "page" => params.page = Some(value),
                "q" => params.q = Some(value),
                "sortBy" => params.sort_by = Some(value),
                "sortByDir" => params.sort_by_dir = Some(value),
                "score" => params.score = value.parse().ok(),
                _ => {}
            }
        }
        Self::from_params(&params)
    }

    /// Serialise back to the URL form; default values are omitted.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        out.append_pair("page", &self.page.to_string());
        if !self.term.is_empty() {
            out.append_pair("q", &self.term);
        }
        out.append_pair("sortBy", self.sort_by.as_str());
        out.append_pair("sortByDir", self.sort_dir.as_str());
        if self.score_filter != NO_SCORE_FILTER {
            out.append_pair("score", &self.score_filter.to_string());
        }
        out.finish()
    }

    /// Clicking the active column flips its direction; a new column keeps
    /// the current direction. The filter term survives, the page resets.
    pub fn set_sort(&mut self, column: SortColumn) {
        if self.sort_by == column {
            self.sort_dir = self.sort_dir.flipped();
        } else {
            self.sort_by = column;
        }
        self.page = 1;
    }

    pub fn set_filter(&mut self, term: impl Into<String>) {
        self.term = term.into();
        self.page = 1;
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(String::new());
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_score_filter(&mut self, min_score: f64) {
        self.score_filter = min_score;
        self.term.clear();
        self.page = 1;
    }

    pub fn offset(&self) -> u32 {
        (self.page.max(1) - 1) * PAGE_SIZE
    }

    pub fn variables(&self, genes: &[String], background_id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": background_id,
            "genes": genes,
            "filterTerm": self.term,
            "offset": self.offset(),
            "first": PAGE_SIZE,
            "filterScoreLe": self.score_filter,
            "sortBy": self.sort_by.as_str(),
            "sortByDir": self.sort_dir.as_str(),
        })
    }
}

// ── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentPage {
    pub total_count: u64,
    pub rows: Vec<EnrichmentResult>,
    /// Enriched term identifiers across the whole result set, fed to key-term enrichment.
    pub enriched_terms: Vec<String>,
    /// Top signatures across the whole result set, fed to Enrichr-term enrichment.
    pub top_enriched_sigs: Vec<String>,
}

impl EnrichmentPage {
    pub fn page_count(&self) -> u64 {
        self.total_count.div_ceil(PAGE_SIZE as u64).max(1)
    }

    pub fn row_views(&self) -> Vec<EnrichmentRow> {
        self.rows.iter().map(EnrichmentRow::from_result).collect()
    }
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// No genes: nothing was requested.
    Skipped,
    /// A request is outstanding.
    Loading,
    Loaded(EnrichmentPage),
    Failed(String),
    /// A newer fetch was issued while this one was in flight.
    Superseded,
}

impl QueryOutcome {
    /// Text shown instead of the table, if any.
    pub fn display_message(&self) -> Option<&str> {
        match self {
            QueryOutcome::Failed(_) => Some(NO_VALID_GENES),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct EnrichmentData {
    background: Option<BackgroundEnrich>,
}

#[derive(Deserialize)]
struct BackgroundEnrich {
    enrich: Option<EnrichConnection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichConnection {
    #[serde(default)]
    nodes: Vec<EnrichmentResult>,
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    enriched_terms: Option<Vec<Option<String>>>,
    #[serde(default)]
    top_enriched_sigs: Option<Vec<Option<String>>>,
}

fn flatten_terms(terms: Option<Vec<Option<String>>>) -> Vec<String> {
    terms.unwrap_or_default().into_iter().flatten().collect()
}

// ── Service ──────────────────────────────────────────────────────────────────

/// Sessions whose latest generation is remembered. An evicted session
/// simply loses the ability to supersede its in-flight fetches.
pub const SESSION_CAPACITY: usize = 4096;

pub struct EnrichmentService {
    exec: Arc<dyn GraphQlExecutor>,
    next_generation: AtomicU64,
    latest: Mutex<LruCache<String, u64>>,
}

impl EnrichmentService {
    pub fn new(exec: Arc<dyn GraphQlExecutor>) -> Self {
        let capacity = NonZeroUsize::new(SESSION_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            exec,
            next_generation: AtomicU64::new(0),
            latest: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Generation of the most recent fetch issued by `session`, 0 if none.
    pub fn current_generation(&self, session: &str) -> u64 {
        self.latest
            .lock()
            .map(|latest| latest.peek(session).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn begin(&self, session: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut latest) = self.latest.lock() {
            latest.put(session.to_string(), generation);
        }
        generation
    }

    fn is_superseded(&self, session: &str, generation: u64) -> bool {
        match self.latest.lock() {
            Ok(latest) => latest.peek(session).is_some_and(|&current| current != generation),
            Err(_) => false,
        }
    }

    /// Fetch one page for `session`. Only a newer fetch from the same
    /// session supersedes this one.
    #[instrument(skip(self, genes), fields(n_genes = genes.len(), page = state.page))]
    pub async fn fetch(
        &self,
        session: &str,
        genes: &[String],
        background_id: &str,
        state: &EnrichmentQueryState,
    ) -> QueryOutcome {
        if genes.is_empty() {
            debug!("No genes, skipping enrichment query");
            return QueryOutcome::Skipped;
        }
        let generation = self.begin(session);

        let result = self.fetch_page(genes, background_id, state).await;

        if self.is_superseded(session, generation) {
            debug!(generation, "Discarding superseded enrichment response");
            return QueryOutcome::Superseded;
        }
        match result {
            Ok(page) => {
                info!(total = page.total_count, "Enrichment page loaded");
                QueryOutcome::Loaded(page)
            }
            Err(e) => {
                warn!("Enrichment query failed: {e}");
                QueryOutcome::Failed(e.to_string())
            }
        }
    }

    async fn fetch_page(
        &self,
        genes: &[String],
        background_id: &str,
        state: &EnrichmentQueryState,
    ) -> Result<EnrichmentPage> {
        let data: EnrichmentData = query(
            self.exec.as_ref(),
            &ENRICHMENT_QUERY,
            state.variables(genes, background_id),
        )
        .await?;

        let Some(conn) = data.background.and_then(|b| b.enrich) else {
            return Ok(EnrichmentPage::default());
        };
        Ok(EnrichmentPage {
            total_count: conn.total_count,
            rows: conn.nodes,
            enriched_terms: flatten_terms(conn.enriched_terms),
            top_enriched_sigs: flatten_terms(conn.top_enriched_sigs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use std::time::Duration;

    fn enrich_response() -> serde_json::Value {
        serde_json::json!({ "background": { "id": "bg", "species": "human", "enrich": {
            "nodes": [{
                "pvalue": 1e-10, "adjPvalue": 1e-8, "oddsRatio": 12.5, "nOverlap": 7,
                "geneSet": { "id": "gs1", "term": "GSE1-ctl-vs-kd-human-up", "nGeneIds": 250 }
            }],
            "totalCount": 17,
            "enrichedTerms": ["liver", null],
            "topEnrichedSigs": ["GSE1-ctl-vs-kd-human-up"]
        }}})
    }

    #[test]
    fn test_defaults() {
        let s = EnrichmentQueryState::default();
        assert_eq!(s.page, 1);
        assert_eq!(s.sort_by, SortColumn::Pvalue);
        assert_eq!(s.sort_dir, SortDirection::Asc);
        assert_eq!(s.score_filter, -1.0);
    }

    #[test]
    fn test_set_sort_same_column_flips_and_keeps_filter() {
        let mut s = EnrichmentQueryState::default();
        s.set_filter("liver");
        s.set_page(4);
        s.set_sort(SortColumn::Pvalue);
        assert_eq!(s.sort_dir, SortDirection::Desc);
        assert_eq!(s.term, "liver");
        assert_eq!(s.page, 1);
    }

    #[test]
    fn test_set_sort_new_column_keeps_direction() {
        let mut s = EnrichmentQueryState { sort_dir: SortDirection::Desc, page: 3, ..Default::default() };
        s.set_sort(SortColumn::OddsRatio);
        assert_eq!(s.sort_by, SortColumn::OddsRatio);
        assert_eq!(s.sort_dir, SortDirection::Desc);
        assert_eq!(s.page, 1);
    }

    #[test]
    fn test_score_filter_clears_term_and_page() {
        let mut s = EnrichmentQueryState::default();
        s.set_filter("kidney");
        s.set_page(2);
        s.set_score_filter(0.5);
        assert_eq!(s.term, "");
        assert_eq!(s.page, 1);
        assert_eq!(s.variables(&[], "bg")["filterScoreLe"], 0.5);
    }

    #[test]
    fn test_query_string_round_trip() {
        let s = EnrichmentQueryState::from_query_string("?page=3&q=heart+failure&sortBy=odds_ratio&sortByDir=desc");
        assert_eq!(s.page, 3);
        assert_eq!(s.term, "heart failure");
        assert_eq!(s.sort_by, SortColumn::OddsRatio);
        assert_eq!(s.sort_dir, SortDirection::Desc);
        assert_eq!(EnrichmentQueryState::from_query_string(&s.to_query_string()), s);
    }

    #[test]
    fn test_bad_query_string_values_fall_back() {
        let s = EnrichmentQueryState::from_query_string("page=zero&sortBy=nope&sortByDir=up&q=a%2Fb");
        assert_eq!(s.page, 1);
        assert_eq!(s.sort_by, SortColumn::Pvalue);
        assert_eq!(s.sort_dir, SortDirection::Asc);
        assert_eq!(s.term, "a/b");
    }

    #[test]
    fn test_variables_page_offset() {
        let mut s = EnrichmentQueryState::default();
        s.set_page(3);
        let v = s.variables(&["STAT3".to_string()], "bg-1");
        assert_eq!(v["offset"], 16);
        assert_eq!(v["first"], 8);
        assert_eq!(v["id"], "bg-1");
        assert_eq!(v["sortBy"], "pvalue");
    }

    #[tokio::test]
    async fn test_empty_gene_list_issues_no_query() {
        let exec = Arc::new(MockExecutor::default());
        let service = EnrichmentService::new(exec.clone());
        let outcome = service.fetch("s1", &[], "bg", &EnrichmentQueryState::default()).await;
        assert!(matches!(outcome, QueryOutcome::Skipped));
        assert_eq!(exec.call_count(), 0);
        assert_eq!(service.current_generation("s1"), 0);
    }

    #[tokio::test]
    async fn test_fetch_loads_page() {
        let exec = Arc::new(MockExecutor::default().with(&ENRICHMENT_QUERY, enrich_response()));
        let service = EnrichmentService::new(exec.clone());
        let genes = vec!["STAT3".to_string()];
        let QueryOutcome::Loaded(page) = service.fetch("s1", &genes, "bg", &EnrichmentQueryState::default()).await else {
            panic!("expected a loaded page");
        };
        assert_eq!(page.total_count, 17);
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.enriched_terms, vec!["liver"]);
        assert_eq!(page.rows[0].n_overlap, 7);
        assert_eq!(exec.last_variables()["genes"][0], "STAT3");
    }

    #[tokio::test]
    async fn test_failure_shows_no_valid_genes() {
        let exec = Arc::new(MockExecutor::default());
        let service = EnrichmentService::new(exec);
        let outcome = service.fetch("s1", &["X".to_string()], "bg", &EnrichmentQueryState::default()).await;
        assert!(matches!(outcome, QueryOutcome::Failed(_)));
        assert_eq!(outcome.display_message(), Some("No valid genes identified"));
    }

    #[tokio::test]
    async fn test_stale_response_is_superseded() {
        let exec = Arc::new(
            MockExecutor::default()
                .with(&ENRICHMENT_QUERY, enrich_response())
                .with_delays(vec![Duration::from_millis(200), Duration::from_millis(0)]),
        );
        let service = Arc::new(EnrichmentService::new(exec));
        let genes = vec!["STAT3".to_string()];

        let slow = {
            let service = service.clone();
            let genes = genes.clone();
            tokio::spawn(async move {
                service.fetch("s1", &genes, "bg", &EnrichmentQueryState::default()).await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut next = EnrichmentQueryState::default();
        next.set_page(2);
        let fresh = service.fetch("s1", &genes, "bg", &next).await;

        assert!(matches!(fresh, QueryOutcome::Loaded(_)));
        assert!(matches!(slow.await.unwrap(), QueryOutcome::Superseded));
        assert_eq!(service.current_generation("s1"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_both_load() {
        let exec = Arc::new(
            MockExecutor::default()
                .with(&ENRICHMENT_QUERY, enrich_response())
                .with_delays(vec![Duration::from_millis(200), Duration::from_millis(0)]),
        );
        let service = Arc::new(EnrichmentService::new(exec));

        let first = {
            let service = service.clone();
            tokio::spawn(async move {
                service.fetch("alice", &["STAT3".to_string()], "bg", &EnrichmentQueryState::default()).await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = service.fetch("bob", &["MYC".to_string()], "bg", &EnrichmentQueryState::default()).await;

        assert!(matches!(second, QueryOutcome::Loaded(_)));
        assert!(matches!(first.await.unwrap(), QueryOutcome::Loaded(_)));
        assert_ne!(service.current_generation("alice"), service.current_generation("bob"));
    }
}
