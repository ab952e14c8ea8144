//! Display rows for enrichment results.

use serde::Serialize;

use rummageo_common::entities::{EnrichmentResult, GeneSetPmid};
use rummageo_common::format::{to_exponential, to_precision};
use rummageo_common::term::{display_term, LinkList, TermParts};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRow {
    pub gene_set_id: String,
    pub term: String,
    pub parts: TermParts,
    pub gse_links: LinkList,
    pub pmid_links: LinkList,
    pub platform_links: LinkList,
    pub title: String,
    pub published_date: String,
    pub condition1_title: String,
    pub condition2_title: String,
    pub condition1_samples: Vec<String>,
    pub condition2_samples: Vec<String>,
    pub direction: String,
    pub n_gene_ids: u32,
    pub n_overlap: u32,
    pub odds_ratio: String,
    pub pvalue: String,
    pub adj_pvalue: String,
    pub silhouette_score: String,
    /// Label handed to the hypothesis workflow as the signature description.
    pub hypothesis_description: String,
}

/// Metadata node holding the sample groups for the term's two conditions.
///
/// With several nodes, the first one wins when it knows both condition
/// labels; otherwise the second node is used.
pub fn choose_metadata<'a>(nodes: &'a [GeneSetPmid], parts: &TermParts) -> Option<&'a GeneSetPmid> {
    match nodes {
        [] => None,
        [only] => Some(only),
        [first, second, ..] => {
            let groups = &first.sample_groups;
            if groups.has_condition(&parts.condition1) && groups.has_condition(&parts.condition2) {
                Some(first)
            } else {
                Some(second)
            }
        }
    }
}

impl EnrichmentRow {
    pub fn from_result(result: &EnrichmentResult) -> Self {
        let (gene_set_id, term, n_gene_ids, nodes) = match &result.gene_set {
            Some(gs) => (gs.id.clone(), display_term(&gs.term).to_string(), gs.n_gene_ids, gs.metadata()),
            None => (String::new(), String::new(), 0, &[][..]),
        };
        let parts = TermParts::parse(&term);

        // study-level fields come from the first node, sample groups from the matching one
        let study = nodes.first();
        let groups = choose_metadata(nodes, &parts).map(|n| &n.sample_groups);

        let condition1_title = groups.map(|g| g.title(&parts.condition1)).unwrap_or_default();
        let condition2_title = groups.map(|g| g.title(&parts.condition2)).unwrap_or_default();
        let direction = parts.direction().label().to_string();
        let hypothesis_description =
            format!("{}: {} vs. {} {}", parts.gse, condition1_title, condition2_title, direction);

        Self {
            gene_set_id,
            gse_links: parts.gse_links(),
            pmid_links: LinkList::from_pmid_field(study.and_then(|s| s.pmid.as_deref())),
            platform_links: LinkList::from_platform_field(study.and_then(|s| s.platform.as_deref())),
            title: study.and_then(|s| s.title.clone()).unwrap_or_default(),
            published_date: study.and_then(|s| s.published_date.clone()).unwrap_or_default(),
            condition1_samples: groups.map(|g| g.samples(&parts.condition1)).unwrap_or_default(),
            condition2_samples: groups.map(|g| g.samples(&parts.condition2)).unwrap_or_default(),
            condition1_title,
            condition2_title,
            direction,
            n_gene_ids,
            n_overlap: result.n_overlap,
            odds_ratio: to_precision(result.odds_ratio, 3),
            pvalue: to_precision(result.pvalue, 3),
            adj_pvalue: to_exponential(result.adj_pvalue, 2),
            silhouette_score: study
                .and_then(|s| s.silhouette_score)
                .map(|s| to_precision(s, 2))
                .unwrap_or_default(),
            hypothesis_description,
            term,
            parts,
        }
    }
}
