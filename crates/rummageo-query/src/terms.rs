//! Term-enrichment aggregation over an enrichment result set.
//!
//! Two flavours share one table model:
//!   key terms     - functional terms mined from the enriched signatures
//!   Enrichr terms - Enrichr library terms over the top signatures
//!
//! Tables filter, sort and paginate in memory. Charts use `-log10` of the
//! adjusted p-value for key terms and of the raw p-value for Enrichr terms.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use rummageo_common::entities::EnrichedTermResult;
use rummageo_common::error::Result;
use rummageo_common::format::neg_log10;
use rummageo_common::Species;

use crate::documents::{ENRICHR_STATS, ENRICHR_TERM_ENRICHMENT, TERM_ENRICHMENT};
use crate::enrichment::SortDirection;
use crate::graphql::{query, GraphQlExecutor};

pub const TERMS_PER_PAGE: usize = 10;

/// Category selector for key-term enrichment; `"A"` means all categories.
pub const ALL_SOURCES: &str = "A";

/// Adjusted p-value cutoff for precomputed Enrichr stats.
pub const ENRICHR_STATS_CUTOFF: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermSource {
    KeyTerms,
    Enrichr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermColumn {
    Term,
    Count,
    OddsRatio,
    Pvalue,
    AdjPvalue,
}

// ── Fetching ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermEnrichmentData {
    #[serde(default)]
    enriched_functional_terms: Option<Vec<EnrichedTermResult>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichrTermEnrichmentData {
    #[serde(default)]
    enriched_enrichr_terms: Option<Vec<EnrichedTermResult>>,
}

#[instrument(skip(exec, enriched_terms), fields(n = enriched_terms.len()))]
pub async fn fetch_key_terms(
    exec: &dyn GraphQlExecutor,
    enriched_terms: &[String],
    source_type: &str,
    species: Species,
) -> Result<Vec<EnrichedTermResult>> {
    if enriched_terms.is_empty() {
        return Ok(vec![]);
    }
    let data: TermEnrichmentData = query(
        exec,
        &TERM_ENRICHMENT,
        serde_json::json!({
            "enrichedTerms": enriched_terms,
            "sourceType": source_type,
            "species": species.as_str(),
        }),
    )
    .await?;
    let rows = data.enriched_functional_terms.unwrap_or_default();
    debug!(rows = rows.len(), "Key-term enrichment loaded");
    Ok(rows)
}

#[instrument(skip(exec, enriched_sigs), fields(n = enriched_sigs.len()))]
pub async fn fetch_enrichr_terms(
    exec: &dyn GraphQlExecutor,
    enriched_sigs: &[String],
    species: Species,
) -> Result<Vec<EnrichedTermResult>> {
    if enriched_sigs.is_empty() {
        return Ok(vec![]);
    }
    let data: EnrichrTermEnrichmentData = query(
        exec,
        &ENRICHR_TERM_ENRICHMENT,
        serde_json::json!({ "enrichedSigs": enriched_sigs, "species": species.as_str() }),
    )
    .await?;
    Ok(data.enriched_enrichr_terms.unwrap_or_default())
}

// ── Table ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TermTable {
    rows: Vec<EnrichedTermResult>,
    source: TermSource,
    search: String,
    page: usize,
    sort: Option<(TermColumn, SortDirection)>,
}

/// One page of a [`TermTable`] plus its chart, as served to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermTablePage {
    pub rows: Vec<EnrichedTermResult>,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    pub bar_chart: BarChart,
    pub word_cloud: Vec<WordWeight>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BarChart {
    pub axis_label: &'static str,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WordWeight {
    pub text: String,
    pub value: f64,
}

fn cmp_opt<T: PartialOrd>(a: Option<T>, b: Option<T>, dir: SortDirection) -> Ordering {
    // missing values sort last whatever the direction
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if dir == SortDirection::Desc { ord.reverse() } else { ord }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl TermTable {
    pub fn new(rows: Vec<EnrichedTermResult>, source: TermSource) -> Self {
        Self { rows, source, search: String::new(), page: 1, sort: None }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn sort_by(&mut self, column: TermColumn, dir: SortDirection) {
        self.sort = Some((column, dir));
    }

    /// Rows matching the search (case-insensitive substring), in sort order.
    pub fn filtered(&self) -> Vec<&EnrichedTermResult> {
        let needle = self.search.to_lowercase();
        let mut rows: Vec<&EnrichedTermResult> = self
            .rows
            .iter()
            .filter(|r| {
                needle.is_empty()
                    || r.term.as_deref().is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .collect();

        if let Some((column, dir)) = self.sort {
            rows.sort_by(|a, b| match column {
                TermColumn::Term => cmp_opt(a.term.as_deref(), b.term.as_deref(), dir),
                TermColumn::Count => cmp_opt(a.count, b.count, dir),
                TermColumn::OddsRatio => cmp_opt(a.odds_ratio, b.odds_ratio, dir),
                TermColumn::Pvalue => cmp_opt(a.pvalue, b.pvalue, dir),
                TermColumn::AdjPvalue => cmp_opt(a.adj_pvalue, b.adj_pvalue, dir),
            });
        }
        rows
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(TERMS_PER_PAGE).max(1)
    }

    pub fn page_rows(&self) -> Vec<&EnrichedTermResult> {
        self.filtered()
            .into_iter()
            .skip((self.page - 1) * TERMS_PER_PAGE)
            .take(TERMS_PER_PAGE)
            .collect()
    }

    fn chart_value(&self, row: &EnrichedTermResult) -> f64 {
        let value = match self.source {
            TermSource::KeyTerms => row.adj_pvalue,
            TermSource::Enrichr => row.pvalue,
        };
        value.map(neg_log10).unwrap_or(0.0)
    }

    /// Bars for the current page.
    pub fn bar_chart(&self) -> BarChart {
        let rows = self.page_rows();
        BarChart {
            axis_label: match self.source {
                TermSource::KeyTerms => "-log10(adjPvalue)",
                TermSource::Enrichr => "-log10(pvalue)",
            },
            labels: rows.iter().map(|r| r.term.clone().unwrap_or_default()).collect(),
            values: rows.iter().map(|r| self.chart_value(r)).collect(),
        }
    }

    /// Word weights over every row, ignoring the search filter.
    pub fn word_cloud(&self) -> Vec<WordWeight> {
        self.rows
            .iter()
            .filter_map(|r| {
                let text = r.term.clone()?;
                let value = (-r.pvalue.unwrap_or(0.5).ln() * 50.0).max(200.0);
                Some(WordWeight { text, value })
            })
            .collect()
    }

    pub fn current_page(&self) -> TermTablePage {
        TermTablePage {
            rows: self.page_rows().into_iter().cloned().collect(),
            page: self.page,
            total_pages: self.total_pages(),
            total_rows: self.filtered().len(),
            bar_chart: self.bar_chart(),
            word_cloud: self.word_cloud(),
        }
    }

    /// Filtered rows as TSV (`term, CountInEnrichedGSEs, Pvalue, AdjPvalue`).
    pub fn to_tsv(&self) -> Result<String> {
        crate::export::terms_tsv(self.filtered())
    }
}

// ── Precomputed Enrichr stats ────────────────────────────────────────────────

/// One significant Enrichr term for a single signature.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichrStatRow {
    pub term: String,
    pub p_value: f64,
    pub adj_p_value: f64,
    pub odds_ratio: f64,
    pub overlap: f64,
    pub library: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichrStatsData {
    enrichr_term_by_sig_and_organism: Option<EnrichrStatsNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichrStatsNode {
    #[serde(default)]
    enrichr_stats: Option<BTreeMap<String, Vec<Vec<serde_json::Value>>>>,
}

fn as_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    match v? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Keep rows with adjusted p below the cutoff, most significant first.
/// Each raw row is `[term, pvalue, adj_pvalue, odds_ratio, overlap]`.
pub fn significant_enrichr_stats(stats: &BTreeMap<String, Vec<Vec<serde_json::Value>>>) -> Vec<EnrichrStatRow> {
    let mut rows: Vec<EnrichrStatRow> = stats
        .iter()
        .flat_map(|(library, rows)| {
            rows.iter().filter_map(move |row| {
                Some(EnrichrStatRow {
                    term: row.first()?.as_str()?.to_string(),
                    p_value: as_f64(row.get(1))?,
                    adj_p_value: as_f64(row.get(2))?,
                    odds_ratio: as_f64(row.get(3)).unwrap_or(f64::NAN),
                    overlap: as_f64(row.get(4)).unwrap_or(0.0),
                    library: library.clone(),
                })
            })
        })
        .filter(|r| r.adj_p_value < ENRICHR_STATS_CUTOFF)
        .collect();
    rows.sort_by(|a, b| a.adj_p_value.partial_cmp(&b.adj_p_value).unwrap_or(Ordering::Equal));
    rows
}

/// Species of a signature decides the Enrichr organism.
pub async fn fetch_enrichr_stats(exec: &dyn GraphQlExecutor, signature: &str) -> Result<Vec<EnrichrStatRow>> {
    let organism = Species::from_term(signature);
    let data: EnrichrStatsData = query(
        exec,
        &ENRICHR_STATS,
        serde_json::json!({ "sig": signature, "organism": organism.as_str() }),
    )
    .await?;
    let stats = data
        .enrichr_term_by_sig_and_organism
        .and_then(|n| n.enrichr_stats)
        .unwrap_or_default();
    Ok(significant_enrichr_stats(&stats))
}
