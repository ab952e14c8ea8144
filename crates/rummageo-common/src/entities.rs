/// Read-only projections of the RummaGEO GraphQL schema.
/// Field names follow the camelCase wire format of the API.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit `null` the same as a missing field.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// A GraphQL connection wrapper (`{ nodes: [...] }`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gene {
    pub symbol: String,
}

// ---------------------------------------------------------------------------
// Gene sets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneSet {
    pub id: String,
    pub term: String,
    #[serde(default, deserialize_with = "null_default")]
    pub n_gene_ids: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub genes: Nodes<Gene>,
    #[serde(default, deserialize_with = "null_default")]
    pub gene_set_pmids_by_id: Nodes<GeneSetPmid>,
}

impl GeneSet {
    pub fn symbols(&self) -> Vec<String> {
        self.genes.nodes.iter().map(|g| g.symbol.clone()).collect()
    }

    /// Metadata nodes attached to this gene set, in server order.
    pub fn metadata(&self) -> &[GeneSetPmid] {
        &self.gene_set_pmids_by_id.nodes
    }
}

/// Study metadata joined to a gene set (one row per GSE the term refers to).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneSetPmid {
    #[serde(default)]
    pub gse: Option<String>,
    #[serde(default)]
    pub gse_id: Option<String>,
    /// Either a single PMID, a comma list, or a list literal such as `['1', '2']`.
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub silhouette_score: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub sample_groups: SampleGroups,
}

/// Per-condition samples and titles, keyed by the condition label used in terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SampleGroups {
    #[serde(default, deserialize_with = "null_default")]
    pub samples: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_default")]
    pub titles: BTreeMap<String, String>,
}

impl SampleGroups {
    pub fn has_condition(&self, label: &str) -> bool {
        self.samples.contains_key(label)
    }

    pub fn title(&self, label: &str) -> String {
        self.titles.get(label).cloned().unwrap_or_default()
    }

    pub fn samples(&self, label: &str) -> Vec<String> {
        self.samples.get(label).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub pvalue: f64,
    pub adj_pvalue: f64,
    pub odds_ratio: f64,
    pub n_overlap: u32,
    pub gene_set: Option<GeneSet>,
}

/// Key-term enrichment row computed server-side over the enriched signatures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTermResult {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub odds_ratio: Option<f64>,
    #[serde(default)]
    pub pvalue: Option<f64>,
    #[serde(default)]
    pub adj_pvalue: Option<f64>,
}

/// Enrichr-term enrichment row; same shape as [`EnrichedTermResult`].
pub type EnrichrResult = EnrichedTermResult;

// ---------------------------------------------------------------------------
// User input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserGeneSet {
    #[serde(default)]
    pub genes: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UserGeneSet {
    /// Non-empty gene symbols, in submission order.
    pub fn valid_genes(&self) -> Vec<String> {
        self.genes
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Background {
    pub id: String,
    pub species: String,
}
