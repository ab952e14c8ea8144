use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;
use crate::error::RummageoError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP client that only talks to approved hosts.
/// Every outbound call of the service (GraphQL, Enrichr, PubMed, LLM, G2SG)
/// goes through one of these.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of RummaGEO collaborators.
    pub fn new() -> Result<Self, RummageoError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RummageoError> {
        let domains = [
            "rummageo.com",            // GraphQL API
            "maayanlab.cloud",         // Enrichr
            "eutils.ncbi.nlm.nih.gov", // PubMed
            "api.openai.com",          // chat completions
            "g2sg.cfde.cloud",         // gene set submission
            "s3.amazonaws.com",        // static downloads
            "localhost",
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| RummageoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of `url`, used for configured upstream endpoints.
    pub fn allow_url(&mut self, url: &str) -> Result<(), RummageoError> {
        let parsed = Url::parse(url)
            .map_err(|e| RummageoError::Config(format!("invalid URL {}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RummageoError::Config(format!("URL has no host: {}", url)))?;
        self.allow_domain(host);
        Ok(())
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        let Some(host) = parsed.host_str() else { return false };
        // exact match or a subdomain of an allowed domain
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    fn check(&self, url: &str) -> Result<(), RummageoError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            warn!(%url, "Blocked request to host outside the allowlist");
            Err(RummageoError::SecurityError(format!(
                "domain not in allowlist for URL {}",
                url
            )))
        }
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, RummageoError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, RummageoError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::RequestBuilder, RummageoError> {
        self.check(url)?;
        Ok(self.client.request(method, url))
    }
}
