//! Composite term decomposition.
//!
//! Signature terms encode their provenance as
//! `<gse>-<condition 1>-vs-<condition 2>-<species>-<direction>`, e.g.
//! `GSE123-ctl-vs-kd-human-up`. The GSE field may hold a comma-joined list
//! of series that were merged into one signature.
//!
//! Decomposition never fails: missing fields come back empty.

use serde::{Deserialize, Serialize};

const GEO_ACC_URL: &str = "https://www.ncbi.nlm.nih.gov/geo/query/acc.cgi?acc=";
const PUBMED_URL: &str = "https://pubmed.ncbi.nlm.nih.gov/";

/// Label rendered in place of an absent PMID or platform.
pub const NOT_AVAILABLE: &str = "N/A";

/// The six positional fields of a composite term, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TermParts {
    pub gse: String,
    pub condition1: String,
    pub separator: String,
    pub condition2: String,
    pub species: String,
    pub direction: String,
}

impl TermParts {
    pub fn parse(term: &str) -> Self {
        let term = display_term(term);

        let Some((gse, rest)) = term.split_once('-') else {
            return Self { gse: term.to_string(), ..Default::default() };
        };

        // species and direction are the last two tokens
        let (rest, direction) = match rest.rsplit_once('-') {
            Some((head, dir)) => (head, dir),
            None => ("", rest),
        };
        let (middle, species) = match rest.rsplit_once('-') {
            Some((head, species)) => (head, species),
            None => ("", rest),
        };

        let (condition1, separator, condition2) = match middle.split_once("-vs-") {
            Some((c1, c2)) => (c1.to_string(), "vs".to_string(), c2.to_string()),
            None => {
                let mut it = middle.splitn(3, '-');
                (
                    it.next().unwrap_or_default().to_string(),
                    it.next().unwrap_or_default().to_string(),
                    it.next().unwrap_or_default().to_string(),
                )
            }
        };

        Self {
            gse: gse.to_string(),
            condition1,
            separator,
            condition2,
            species: species.to_string(),
            direction: direction.to_string(),
        }
    }

    /// Positional view matching the term layout.
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.gse,
            &self.condition1,
            &self.separator,
            &self.condition2,
            &self.species,
            &self.direction,
        ]
    }

    pub fn direction(&self) -> Direction {
        Direction::from_token(&self.direction)
    }

    /// One GEO link per series accession.
    pub fn gse_links(&self) -> LinkList {
        LinkList::geo(split_multi(&self.gse))
    }
}

/// Strip the `.tsv` suffix that some library terms still carry.
pub fn display_term(term: &str) -> &str {
    term.strip_suffix(".tsv").unwrap_or(term)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Either,
}

impl Direction {
    pub fn from_token(token: &str) -> Self {
        match token {
            "up" => Direction::Up,
            "dn" => Direction::Down,
            _ => Direction::Either,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Either => "Up/Down",
        }
    }
}

// ---------------------------------------------------------------------------
// Multi-value fields and links
// ---------------------------------------------------------------------------

/// Split a multi-value metadata field.
///
/// Accepts a plain value, a comma-joined list, or a list literal with single
/// quotes (`['GPL1', 'GPL2']`) as stored by the metadata loader.
pub fn split_multi(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return vec![];
    }
    if raw.starts_with('[') {
        let normalised = raw.replace('\'', "\"");
        if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(&normalised) {
            return values
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
    raw.trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalLink {
    pub label: String,
    pub href: String,
}

/// A list of external links; empty lists render as [`NOT_AVAILABLE`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LinkList {
    pub links: Vec<ExternalLink>,
}

impl LinkList {
    pub fn geo(accessions: Vec<String>) -> Self {
        Self {
            links: accessions
                .into_iter()
                .map(|acc| ExternalLink { href: format!("{GEO_ACC_URL}{acc}"), label: acc })
                .collect(),
        }
    }

    pub fn pubmed(pmids: Vec<String>) -> Self {
        Self {
            links: pmids
                .into_iter()
                .map(|pmid| ExternalLink { href: format!("{PUBMED_URL}{pmid}/"), label: pmid })
                .collect(),
        }
    }

    /// PubMed links for an optional raw PMID field.
    pub fn from_pmid_field(raw: Option<&str>) -> Self {
        Self::pubmed(raw.map(split_multi).unwrap_or_default())
    }

    /// GEO platform links for an optional raw platform field.
    pub fn from_platform_field(raw: Option<&str>) -> Self {
        Self::geo(raw.map(split_multi).unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Comma-joined labels, or `N/A` when empty.
    pub fn label(&self) -> String {
        if self.links.is_empty() {
            return NOT_AVAILABLE.to_string();
        }
        self.links.iter().map(|l| l.label.as_str()).collect::<Vec<_>>().join(", ")
    }
}
