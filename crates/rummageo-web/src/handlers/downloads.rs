//! Bulk archive listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use rummageo_common::Species;

use crate::state::SharedState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    Signatures,
    Metadata,
    CoOccurrence,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveLink {
    /// Object key under the archive base URL.
    pub file: &'static str,
    /// Suggested local filename.
    pub download_as: &'static str,
    pub species: Species,
    pub kind: ArchiveKind,
    pub url: String,
}

/// (file, download_as, species, kind)
const ARCHIVES: [(&str, &str, Species, ArchiveKind); 8] = [
    ("human-geo-auto.gmt.gz", "human-geo-auto.gmt.gz", Species::Human, ArchiveKind::Signatures),
    ("human-gse-processed-meta.json", "human-gse-processed-meta.json", Species::Human, ArchiveKind::Metadata),
    ("mouse-geo-auto.gmt.gz", "mouse-geo-auto.gmt.gz", Species::Mouse, ArchiveKind::Signatures),
    ("mouse-gse-processed-meta.json", "mouse-gse-processed-meta.json", Species::Mouse, ArchiveKind::Metadata),
    ("random50k_co-occurrence_coding.f", "human_random50k_co-occurrence_coding.f", Species::Human, ArchiveKind::CoOccurrence),
    ("random50k_co-occurrence_noncoding.f", "human_random50k_co-occurrence_noncoding.f", Species::Human, ArchiveKind::CoOccurrence),
    ("mouse_random50k_co-occurrence_coding.f", "mouse_random50k_co-occurrence_coding.f", Species::Mouse, ArchiveKind::CoOccurrence),
    ("mouse_random50k_co-occurrence_noncoding.f", "mouse_random50k_co-occurrence_noncoding.f", Species::Mouse, ArchiveKind::CoOccurrence),
];

pub fn archive_links(base_url: &str) -> Vec<ArchiveLink> {
    let base = base_url.trim_end_matches('/');
    ARCHIVES
        .iter()
        .map(|&(file, download_as, species, kind)| ArchiveLink {
            file,
            download_as,
            species,
            kind,
            url: format!("{base}/{file}"),
        })
        .collect()
}

/// GET /downloads
pub async fn downloads(State(state): State<SharedState>) -> Json<Vec<ArchiveLink>> {
    Json(archive_links(&state.config.downloads.archive_base_url))
}
