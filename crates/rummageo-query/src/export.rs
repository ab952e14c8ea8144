//! Tab-separated exports of result tables.

use anyhow::Context;

use rummageo_common::entities::EnrichedTermResult;
use rummageo_common::error::Result;

use crate::rows::EnrichmentRow;

fn tsv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing TSV buffer: {}", e.error()))?;
    Ok(String::from_utf8(bytes).context("TSV output is not UTF-8")?)
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub fn terms_tsv<'a>(rows: impl IntoIterator<Item = &'a EnrichedTermResult>) -> Result<String> {
    let mut w = tsv_writer();
    w.write_record(["term", "CountInEnrichedGSEs", "Pvalue", "AdjPvalue"])
        .context("writing TSV header")?;
    for row in rows {
        w.write_record([
            row.term.clone().unwrap_or_default(),
            opt(row.count),
            opt(row.pvalue),
            opt(row.adj_pvalue),
        ])
        .context("writing TSV row")?;
    }
    finish(w)
}

/// Enrichment results as shown in the main table, one signature per line.
pub fn enrichment_tsv(rows: &[EnrichmentRow]) -> Result<String> {
    let mut w = tsv_writer();
    w.write_record([
        "term", "gse", "condition1", "condition2", "direction", "pmid", "platform",
        "nOverlap", "nGeneIds", "oddsRatio", "pvalue", "adjPvalue", "silhouetteScore",
    ])
    .context("writing TSV header")?;
    for r in rows {
        w.write_record([
            r.term.clone(),
            r.parts.gse.clone(),
            r.condition1_title.clone(),
            r.condition2_title.clone(),
            r.direction.clone(),
            r.pmid_links.label(),
            r.platform_links.label(),
            r.n_overlap.to_string(),
            r.n_gene_ids.to_string(),
            r.odds_ratio.clone(),
            r.pvalue.clone(),
            r.adj_pvalue.clone(),
            r.silhouette_score.clone(),
        ])
        .context("writing TSV row")?;
    }
    finish(w)
}
