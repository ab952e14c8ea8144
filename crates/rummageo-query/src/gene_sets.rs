//! Gene-set lookups: members, overlap with a user list, stored user gene
//! sets, GSE summaries and library term search.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use rummageo_common::entities::{Gene, GeneSet, Nodes, UserGeneSet};
use rummageo_common::error::{Result, RummageoError};

use crate::documents::{
    ADD_USER_GENE_SET, FETCH_USER_GENE_SET, OVERLAP_QUERY, QUERY_GSE_SUMMARY, TERM_SEARCH,
    VIEW_GENE_SET,
};
use crate::graphql::{query, GraphQlExecutor};

pub const TERM_SEARCH_LIMIT: u32 = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneSetData {
    gene_set: Option<GeneSet>,
}

pub async fn view_gene_set(exec: &dyn GraphQlExecutor, id: &str) -> Result<GeneSet> {
    let data: GeneSetData = query(exec, &VIEW_GENE_SET, serde_json::json!({ "id": id })).await?;
    data.gene_set
        .ok_or_else(|| RummageoError::NotFound(format!("gene set {id}")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverlapData {
    gene_set: Option<OverlapNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverlapNode {
    #[serde(default)]
    overlap: Nodes<Gene>,
}

/// Genes shared by a library gene set and the user's list.
#[instrument(skip(exec, genes), fields(n_genes = genes.len()))]
pub async fn overlap(exec: &dyn GraphQlExecutor, id: &str, genes: &[String]) -> Result<Vec<String>> {
    let data: OverlapData = query(
        exec,
        &OVERLAP_QUERY,
        serde_json::json!({ "id": id, "genes": genes }),
    )
    .await?;
    let node = data
        .gene_set
        .ok_or_else(|| RummageoError::NotFound(format!("gene set {id}")))?;
    let symbols: Vec<String> = node.overlap.nodes.into_iter().map(|g| g.symbol).collect();
    debug!(overlap = symbols.len(), "Overlap computed");
    Ok(symbols)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserGeneSetData {
    user_gene_set: Option<UserGeneSet>,
}

pub async fn fetch_user_gene_set(exec: &dyn GraphQlExecutor, id: &str) -> Result<UserGeneSet> {
    let data: UserGeneSetData =
        query(exec, &FETCH_USER_GENE_SET, serde_json::json!({ "id": id })).await?;
    data.user_gene_set
        .ok_or_else(|| RummageoError::NotFound(format!("user gene set {id}")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserGeneSetData {
    add_user_gene_set: Option<AddUserGeneSetPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserGeneSetPayload {
    user_gene_set: Option<IdNode>,
}

#[derive(Deserialize)]
struct IdNode {
    id: String,
}

/// Store a user gene list; returns its id.
pub async fn add_user_gene_set(exec: &dyn GraphQlExecutor, user: &UserGeneSet) -> Result<String> {
    let data: AddUserGeneSetData = query(
        exec,
        &ADD_USER_GENE_SET,
        serde_json::json!({
            "genes": user.valid_genes(),
            "description": user.description.clone().unwrap_or_default(),
        }),
    )
    .await?;
    data.add_user_gene_set
        .and_then(|p| p.user_gene_set)
        .map(|n| n.id)
        .ok_or_else(|| RummageoError::GraphQl("addUserGeneSet returned no id".to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GseSummaryData {
    gse_info: Option<GseInfo>,
}

#[derive(Deserialize)]
struct GseInfo {
    summary: Option<String>,
}

/// Abstract of a GEO series; empty when the series is unknown.
pub async fn gse_summary(exec: &dyn GraphQlExecutor, gse: &str) -> Result<String> {
    let data: GseSummaryData =
        query(exec, &QUERY_GSE_SUMMARY, serde_json::json!({ "id": gse })).await?;
    Ok(data.gse_info.and_then(|i| i.summary).unwrap_or_default())
}

// ── Term search ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TermSearchHit {
    pub id: String,
    pub term: String,
    #[serde(default)]
    pub n_gene_ids: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSearchResults {
    #[serde(default)]
    pub nodes: Vec<TermSearchHit>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermSearchData {
    gene_set_term_search: Option<TermSearchResults>,
}

/// Whitespace-separated search words, empties dropped.
pub fn search_words(q: &str) -> Vec<String> {
    q.split_whitespace().map(String::from).collect()
}

pub async fn term_search(exec: &dyn GraphQlExecutor, q: &str) -> Result<TermSearchResults> {
    let terms = search_words(q);
    if terms.is_empty() {
        return Ok(TermSearchResults::default());
    }
    let data: TermSearchData = query(
        exec,
        &TERM_SEARCH,
        serde_json::json!({ "terms": terms, "first": TERM_SEARCH_LIMIT }),
    )
    .await?;
    Ok(data.gene_set_term_search.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[tokio::test]
    async fn test_view_gene_set_members() {
        let exec = MockExecutor::default().with(
            &VIEW_GENE_SET,
            serde_json::json!({ "geneSet": {
                "id": "gs", "term": "GSE1-a-vs-b-human-up", "nGeneIds": 2,
                "genes": { "nodes": [{ "symbol": "A1BG" }, { "symbol": "TP53" }] }
            }}),
        );
        let gs = view_gene_set(&exec, "gs").await.unwrap();
        assert_eq!(gs.symbols(), vec!["A1BG", "TP53"]);
    }

    #[tokio::test]
    async fn test_unknown_gene_set_is_not_found() {
        let exec = MockExecutor::default().with(&VIEW_GENE_SET, serde_json::json!({ "geneSet": null }));
        assert!(matches!(view_gene_set(&exec, "x").await, Err(RummageoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_overlap_returns_symbols() {
        let exec = MockExecutor::default().with(
            &OVERLAP_QUERY,
            serde_json::json!({ "geneSet": { "overlap": { "nodes": [{ "symbol": "STAT3" }] } } }),
        );
        let genes = overlap(&exec, "gs", &["STAT3".to_string(), "MYC".to_string()]).await.unwrap();
        assert_eq!(genes, vec!["STAT3"]);
        assert_eq!(exec.last_variables()["genes"][1], "MYC");
    }

    #[tokio::test]
    async fn test_add_user_gene_set_drops_blank_genes() {
        let exec = MockExecutor::default().with(
            &ADD_USER_GENE_SET,
            serde_json::json!({ "addUserGeneSet": { "userGeneSet": { "id": "u-1" } } }),
        );
        let user = UserGeneSet {
            genes: vec!["STAT3".into(), " ".into(), "MYC".into()],
            description: None,
        };
        assert_eq!(add_user_gene_set(&exec, &user).await.unwrap(), "u-1");
        assert_eq!(exec.last_variables()["genes"], serde_json::json!(["STAT3", "MYC"]));
        assert_eq!(exec.last_variables()["description"], "");
    }

    #[tokio::test]
    async fn test_gse_summary_defaults_to_empty() {
        let exec = MockExecutor::default().with(&QUERY_GSE_SUMMARY, serde_json::json!({ "gseInfo": null }));
        assert_eq!(gse_summary(&exec, "GSE1").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_term_search_splits_words() {
        let exec = MockExecutor::default().with(
            &TERM_SEARCH,
            serde_json::json!({ "geneSetTermSearch": { "nodes": [], "totalCount": 0 } }),
        );
        term_search(&exec, "  liver   fibrosis ").await.unwrap();
        assert_eq!(exec.last_variables()["terms"], serde_json::json!(["liver", "fibrosis"]));

        term_search(&exec, "   ").await.unwrap();
        assert_eq!(exec.call_count(), 1);
    }
}
