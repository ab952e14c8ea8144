//! G2SG (gene set to knowledge-graph subgraph) registration.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use rummageo_common::error::{Result, RummageoError};
use rummageo_common::sandbox::SandboxClient;

pub const G2SG_URL: &str = "https://g2sg.cfde.cloud";

#[derive(Debug, Serialize)]
struct AddGeneset<'a> {
    term: &'a str,
    genes: &'a [String],
    description: String,
}

#[derive(Debug, Deserialize)]
struct AddGenesetResponse {
    #[serde(default)]
    text: Option<String>,
}

pub struct G2sgClient {
    client: SandboxClient,
    base_url: String,
}

impl G2sgClient {
    pub fn new(client: SandboxClient) -> Self {
        Self::with_base_url(client, G2SG_URL)
    }

    pub fn with_base_url(client: SandboxClient, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn analyze_url(&self, session_id: &str) -> String {
        format!("{}/analyze/{}", self.base_url, session_id)
    }

    /// Register a gene set and return the analysis page URL for its session.
    #[instrument(skip(self, genes), fields(n_genes = genes.len()))]
    pub async fn register(&self, term: &str, genes: &[String], description: &str) -> Result<String> {
        let body = AddGeneset { term, genes, description: format!("Rummagene {description}") };
        let resp = self.client
            .post(&format!("{}/api/addGeneset", self.base_url))?
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let parsed: AddGenesetResponse = resp.json().await.unwrap_or(AddGenesetResponse { text: None });
        let session_id = session_from(parsed, status)?;
        info!(%session_id, "Registered gene set with G2SG");
        Ok(self.analyze_url(&session_id))
    }
}

fn session_from(resp: AddGenesetResponse, status: u16) -> Result<String> {
    match resp.text.filter(|s| !s.is_empty()) {
        Some(session) if status < 400 => Ok(session),
        _ => Err(RummageoError::Upstream {
            status: 500,
            message: "Failed to Register Gene Set".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_required() {
        let ok = session_from(AddGenesetResponse { text: Some("s-1".into()) }, 200).unwrap();
        assert_eq!(ok, "s-1");
        assert!(session_from(AddGenesetResponse { text: None }, 200).is_err());
        assert!(session_from(AddGenesetResponse { text: Some(String::new()) }, 200).is_err());
        assert!(session_from(AddGenesetResponse { text: Some("s".into()) }, 502).is_err());
    }

    #[test]
    fn test_description_prefix_and_analyze_url() {
        let body = AddGeneset {
            term: "GSE1-a-vs-b-human-up",
            genes: &["STAT3".to_string()],
            description: format!("Rummagene {}", "GSE1-a-vs-b-human-up"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["description"], "Rummagene GSE1-a-vs-b-human-up");
        assert_eq!(json["genes"][0], "STAT3");

        let client = G2sgClient::new(SandboxClient::new().unwrap());
        assert_eq!(client.analyze_url("abc"), "https://g2sg.cfde.cloud/analyze/abc");
    }
}
