//! PubMed E-utilities client.
//!
//! Used as a fallback abstract source when a GEO series has no summary.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use rummageo_common::error::{Result, RummageoError};
use rummageo_common::sandbox::SandboxClient;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubMedArticle {
    pub pmid: String,
    pub title: String,
    pub abstract_text: String,
    pub journal: Option<String>,
    pub authors: Vec<String>,
}

/// Search and abstract retrieval for a literature database.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Identifiers of articles matching a query.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;

    async fn fetch_abstracts(&self, ids: &[String]) -> Result<Vec<PubMedArticle>>;

    /// First non-empty abstract among `ids`, if any.
    async fn first_abstract(&self, ids: &[String]) -> Result<Option<String>> {
        Ok(self
            .fetch_abstracts(ids)
            .await?
            .into_iter()
            .map(|a| a.abstract_text)
            .find(|a| !a.trim().is_empty()))
    }
}

pub struct PubMedClient {
    client: SandboxClient,
    api_key: Option<SecretString>,
}

impl PubMedClient {
    pub fn new(client: SandboxClient, api_key: Option<SecretString>) -> Self {
        Self { client, api_key }
    }

    fn with_key(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.expose_secret().to_string()));
        }
        params
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let params = self.with_key(vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmax", max_results.to_string()),
            ("retmode", "json".to_string()),
        ]);

        let resp: serde_json::Value = self.client
            .get(ESEARCH_URL)?
            .query(&params)
            .send()
            .await?
            .json()
            .await?;

        let ids: Vec<String> = resp["esearchresult"]["idlist"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        debug!(?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    #[instrument(skip(self), fields(n = ids.len()))]
    async fn fetch_abstracts(&self, ids: &[String]) -> Result<Vec<PubMedArticle>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let params = self.with_key(vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("rettype", "abstract".to_string()),
            ("retmode", "xml".to_string()),
        ]);

        let xml = self.client
            .get(EFETCH_URL)?
            .query(&params)
            .send()
            .await?
            .text()
            .await?;

        parse_pubmed_xml(&xml)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Pmid,
    Title,
    Abstract,
    LastName,
    ForeName,
    Journal,
}

/// Parse efetch abstract XML (`<PubmedArticleSet><PubmedArticle>...`).
/// Structured abstracts (several `AbstractText` sections) are joined with a space.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<PubMedArticle>> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<PubMedArticle> = None;
    let mut field = Field::None;
    // PMIDs also appear in CommentsCorrections; only the first one counts
    let mut pmid_seen = false;
    let mut last_name = String::new();
    let mut fore_name = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"PubmedArticle" => {
                    current = Some(PubMedArticle::default());
                    pmid_seen = false;
                }
                b"PMID" if !pmid_seen => field = Field::Pmid,
                b"ArticleTitle" => field = Field::Title,
                b"AbstractText" => {
                    if let Some(a) = current.as_mut().filter(|a| !a.abstract_text.is_empty()) {
                        a.abstract_text.push(' ');
                    }
                    field = Field::Abstract;
                }
                b"Author" => {
                    last_name.clear();
                    fore_name.clear();
                }
                b"LastName" => field = Field::LastName,
                b"ForeName" => field = Field::ForeName,
                b"Title" => field = Field::Journal,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| RummageoError::Xml(err.to_string()))?;
                if let Some(a) = current.as_mut() {
                    match field {
                        Field::Pmid => a.pmid.push_str(&text),
                        Field::Title => a.title.push_str(&text),
                        Field::Abstract => a.abstract_text.push_str(&text),
                        Field::LastName => last_name.push_str(&text),
                        Field::ForeName => fore_name.push_str(&text),
                        Field::Journal => a.journal.get_or_insert_with(String::new).push_str(&text),
                        Field::None => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"PMID" => {
                    if field == Field::Pmid {
                        pmid_seen = true;
                    }
                    field = Field::None;
                }
                b"ArticleTitle" | b"AbstractText" | b"LastName" | b"ForeName" | b"Title" => {
                    field = Field::None;
                }
                b"Author" => {
                    if let Some(a) = current.as_mut() {
                        let name = if fore_name.is_empty() {
                            last_name.clone()
                        } else {
                            format!("{fore_name} {last_name}")
                        };
                        if !name.is_empty() {
                            a.authors.push(name);
                        }
                    }
                }
                b"PubmedArticle" => {
                    if let Some(a) = current.take() {
                        if a.pmid.is_empty() {
                            warn!("Skipping article without PMID");
                        } else {
                            articles.push(a);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(RummageoError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(articles)
}
