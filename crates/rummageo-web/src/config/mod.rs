//! Configuration loading for the RummaGEO service.
//! Reads rummageo.toml from the current directory or the path in the
//! RUMMAGEO_CONFIG env var. Every section is optional.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use rummageo_hypothesis::WorkflowConfig;
use rummageo_sources::enrichr::{ENRICHR_URL, HYPOTHESIS_LIBRARIES};
use rummageo_sources::g2sg::G2SG_URL;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub hypothesis: HypothesisConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 3000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// The GraphQL API the service fronts.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_graphiql_url")]
    pub graphiql_url: String,
    #[serde(default = "default_gmt_url")]
    pub download_gmt_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_graphql_url()  -> String { "https://rummageo.com/graphql".to_string() }
fn default_graphiql_url() -> String { "https://rummageo.com/graphiql".to_string() }
fn default_gmt_url()      -> String { "https://rummageo.com/download.gmt".to_string() }
fn default_http_timeout() -> u64    { 60 }

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            graphiql_url: default_graphiql_url(),
            download_gmt_url: default_gmt_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// OpenAI-compatible endpoint; the OpenAI API when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Falls back to the OPENAI_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

fn default_llm_model()  -> String { "gpt-4o".to_string() }
fn default_max_tokens() -> u32    { 1000 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HypothesisConfig {
    #[serde(default = "default_libraries")]
    pub libraries: Vec<String>,
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
    #[serde(default = "default_library_delay")]
    pub library_delay_ms: u64,
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_libraries() -> Vec<String> {
    HYPOTHESIS_LIBRARIES.iter().map(|l| l.to_string()).collect()
}
fn default_top_terms()      -> usize { 3 }
fn default_library_delay()  -> u64   { 500 }
fn default_step_timeout()   -> u64   { 60 }
fn default_cache_capacity() -> usize { 256 }

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            libraries: default_libraries(),
            top_terms: default_top_terms(),
            library_delay_ms: default_library_delay(),
            step_timeout_secs: default_step_timeout(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_enrichr_url")]
    pub enrichr_url: String,
    #[serde(default = "default_g2sg_url")]
    pub g2sg_url: String,
    /// Raises the E-utilities rate limit when set.
    #[serde(default)]
    pub ncbi_api_key: Option<SecretString>,
    /// Use PubMed abstracts when a series has no summary.
    #[serde(default = "bool_true")]
    pub pubmed_fallback: bool,
}

fn default_enrichr_url() -> String { ENRICHR_URL.to_string() }
fn default_g2sg_url()    -> String { G2SG_URL.to_string() }
fn bool_true()           -> bool   { true }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enrichr_url: default_enrichr_url(),
            g2sg_url: default_g2sg_url(),
            ncbi_api_key: None,
            pubmed_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    #[serde(default = "default_archive_url")]
    pub archive_base_url: String,
}

fn default_archive_url() -> String {
    "https://s3.amazonaws.com/maayanlab-public/rummageo".to_string()
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self { archive_base_url: default_archive_url() }
    }
}

mod tests;

impl Config {
    /// Load configuration from rummageo.toml.
    /// An explicit RUMMAGEO_CONFIG path must exist; a missing default file
    /// means built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let explicit = std::env::var("RUMMAGEO_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| "rummageo.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&content)?
        } else if explicit.is_some() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy rummageo.example.toml to rummageo.toml and edit it.",
                path
            );
        } else {
            Config::default()
        };

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("OPENAI_API_KEY").ok().map(SecretString::from);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            libraries: self.hypothesis.libraries.clone(),
            top_terms: self.hypothesis.top_terms,
            library_delay: Duration::from_millis(self.hypothesis.library_delay_ms),
            step_timeout: Duration::from_secs(self.hypothesis.step_timeout_secs),
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            cache_capacity: self.hypothesis.cache_capacity,
        }
    }
}
