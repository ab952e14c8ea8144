//! Enrichr context for a hypothesis: top terms per library over the
//! overlapping genes.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};

use rummageo_sources::{EnrichrRow, EnrichrSource};

use crate::error::HypothesisError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LibraryTerms {
    pub library: String,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EnrichedTerms {
    /// Libraries in request order with their top terms.
    pub by_library: Vec<LibraryTerms>,
    /// Full Enrichr row per term, used for annotation.
    pub stats: BTreeMap<String, EnrichrRow>,
}

impl EnrichedTerms {
    /// `"<library>: t1, t2, t3\n"` per library.
    pub fn prompt_lines(&self) -> String {
        self.by_library
            .iter()
            .map(|l| format!("{}: {}\n", l.library, l.terms.join(", ")))
            .collect()
    }
}

pub(crate) async fn bounded<T, E>(
    step: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
    wrap: impl FnOnce(E) -> HypothesisError,
) -> Result<T, HypothesisError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(wrap),
        Err(_) => Err(HypothesisError::Timeout { step, after: limit }),
    }
}

/// Upload `genes` once, then query each library strictly one after
/// another, pausing `delay` after every call.
#[instrument(skip(source, genes, libraries), fields(n_genes = genes.len()))]
pub async fn collect(
    source: &dyn EnrichrSource,
    genes: &[String],
    libraries: &[String],
    top_n: usize,
    delay: Duration,
    step_timeout: Duration,
) -> Result<EnrichedTerms, HypothesisError> {
    let list = bounded("Enrichr", step_timeout, source.add_list(genes, ""), HypothesisError::Enrichr).await?;

    let mut enriched = EnrichedTerms::default();
    for library in libraries {
        let rows = bounded(
            "Enrichr",
            step_timeout,
            source.enrich(list.user_list_id, library),
            HypothesisError::Enrichr,
        )
        .await?;

        let top: Vec<EnrichrRow> = rows.into_iter().take(top_n).collect();
        debug!(%library, n = top.len(), "Enrichr library done");
        enriched.by_library.push(LibraryTerms {
            library: library.clone(),
            terms: top.iter().map(|r| r.term.clone()).collect(),
        });
        for row in top {
            enriched.stats.insert(row.term.clone(), row);
        }
        tokio::time::sleep(delay).await;
    }
    Ok(enriched)
}
