//! Enrichr client.
//!
//! Endpoints used:
//!   addList: POST https://maayanlab.cloud/Enrichr/addList  (multipart: list, description)
//!   enrich:  GET  https://maayanlab.cloud/Enrichr/enrich?userListId=..&backgroundType=<library>
//!
//! An enrich row is `[rank, term, pvalue, odds ratio, combined score,
//! overlapping genes, adjusted pvalue, ...]`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use rummageo_common::error::{Result, RummageoError};
use rummageo_common::sandbox::SandboxClient;

pub const ENRICHR_URL: &str = "https://maayanlab.cloud/Enrichr";

/// Libraries queried for hypothesis context, in request order.
pub const HYPOTHESIS_LIBRARIES: [&str; 4] = [
    "WikiPathway_2023_Human",
    "GWAS_Catalog_2023",
    "GO_Biological_Process_2023",
    "MGI_Mammalian_Phenotype_Level_4_2021",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserList {
    pub user_list_id: u64,
    #[serde(default)]
    pub short_id: String,
}

/// One Enrichr result row, tagged with the library it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichrRow {
    pub rank: u32,
    pub term: String,
    pub pvalue: f64,
    pub odds_ratio: f64,
    pub combined_score: f64,
    pub overlapping_genes: Vec<String>,
    pub adj_pvalue: f64,
    pub library: String,
}

impl EnrichrRow {
    /// Decode a positional row; `None` when rank or term is missing.
    pub fn from_raw(raw: &[serde_json::Value], library: &str) -> Option<Self> {
        let num = |i: usize| raw.get(i).and_then(serde_json::Value::as_f64).unwrap_or(f64::NAN);
        Some(Self {
            rank: raw.first()?.as_u64()? as u32,
            term: raw.get(1)?.as_str()?.to_string(),
            pvalue: num(2),
            odds_ratio: num(3),
            combined_score: num(4),
            overlapping_genes: raw
                .get(5)
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|g| g.as_str().map(String::from)).collect())
                .unwrap_or_default(),
            adj_pvalue: num(6),
            library: library.to_string(),
        })
    }
}

/// Gene list upload and per-library enrichment.
#[async_trait]
pub trait EnrichrSource: Send + Sync {
    async fn add_list(&self, genes: &[String], description: &str) -> Result<UserList>;

    /// Results for one library, most significant first.
    async fn enrich(&self, user_list_id: u64, library: &str) -> Result<Vec<EnrichrRow>>;
}

/// Newline-joined gene list with single quotes removed.
pub fn gene_list_payload(genes: &[String]) -> String {
    genes.join("\n").replace('\'', "")
}

pub struct EnrichrClient {
    client: SandboxClient,
    base_url: String,
}

impl EnrichrClient {
    pub fn new(client: SandboxClient) -> Self {
        Self::with_base_url(client, ENRICHR_URL)
    }

    pub fn with_base_url(client: SandboxClient, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl EnrichrSource for EnrichrClient {
    #[instrument(skip(self, genes), fields(n_genes = genes.len()))]
    async fn add_list(&self, genes: &[String], description: &str) -> Result<UserList> {
        let form = reqwest::multipart::Form::new()
            .text("list", gene_list_payload(genes))
            .text("description", description.to_string());

        let resp = self.client
            .post(&format!("{}/addList", self.base_url))?
            .multipart(form)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status >= 400 {
            return Err(RummageoError::Upstream {
                status,
                message: "Enrichr rejected the gene list".to_string(),
            });
        }
        let list: UserList = resp.json().await?;
        debug!(user_list_id = list.user_list_id, "Enrichr list added");
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn enrich(&self, user_list_id: u64, library: &str) -> Result<Vec<EnrichrRow>> {
        let resp = self.client
            .get(&format!("{}/enrich", self.base_url))?
            .query(&[
                ("userListId", user_list_id.to_string()),
                ("backgroundType", library.to_string()),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status >= 400 {
            return Err(RummageoError::Upstream {
                status,
                message: "Error fetching enrichment results".to_string(),
            });
        }
        let json: serde_json::Value = resp.json().await?;
        parse_enrich_response(&json, library)
    }
}

/// Rows under the library key of an enrich response.
pub fn parse_enrich_response(json: &serde_json::Value, library: &str) -> Result<Vec<EnrichrRow>> {
    let rows = json[library].as_array().ok_or_else(|| {
        RummageoError::NotFound(format!("no results for library {library}"))
    })?;
    Ok(rows
        .iter()
        .filter_map(|r| r.as_array())
        .filter_map(|r| EnrichrRow::from_raw(r, library))
        .collect())
}
