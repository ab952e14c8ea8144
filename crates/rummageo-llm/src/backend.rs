//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OpenAiBackend           - OpenAI API (gpt-4o, gpt-4o-mini, …)
//!   OpenAiCompatibleBackend - any OpenAI-compatible endpoint (vLLM, Ollama,
//!                             LMStudio, OpenRouter, …)
//!
//! Both send through a [`SandboxClient`], so the endpoint host must be on
//! its allowlist.

use async_trait::async_trait;
use rummageo_common::sandbox::SandboxClient;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Endpoint blocked: {0}")]
    Blocked(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Completion returned no choices")]
    EmptyCompletion,
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
    fn max_output_tokens(&self) -> usize;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn chat_body(req: &LlmRequest, fallback_model: &str) -> serde_json::Value {
    serde_json::json!({
        "model":       req.model.as_deref().unwrap_or(fallback_model),
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(1000),
        "temperature": req.temperature.unwrap_or(0.0),
    })
}

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> Result<LlmResponse, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::EmptyCompletion)?
        .to_string();
    Ok(LlmResponse {
        content,
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

// ── 1. OpenAI ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    pub model: String,
    api_key: SecretString,
    url: String,
    client: SandboxClient,
}

impl OpenAiBackend {
    pub fn new(client: SandboxClient, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key,
            url: OPENAI_CHAT_URL.to_string(),
            client,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = chat_body(&req, &self.model);
        let resp = self.client
            .post(&self.url)
            .map_err(|e| LlmError::Blocked(e.to_string()))?
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 16_384 }
}

// ── 2. OpenAI-Compatible ─────────────────────────────────────────────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<SecretString>,
    client: SandboxClient,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        client: SandboxClient,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client,
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k.expose_secret()),
            None    => req,
        }
    }

    fn is_loopback(&self) -> bool {
        self.base_url.contains("://localhost") || self.base_url.contains("://127.0.0.1")
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = chat_body(&req, &self.model);
        let request = self.client.post(&url).map_err(|e| LlmError::Blocked(e.to_string()))?;
        let resp = self.auth(request).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { self.is_loopback() }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> SandboxClient {
        SandboxClient::new().unwrap()
    }

    fn hello() -> LlmRequest {
        LlmRequest {
            messages: vec![Message::user("hello")],
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_endpoint_outside_allowlist_is_refused() {
        let b = OpenAiCompatibleBackend::new(sandbox(), "https://llm.example.org", "x", None);
        assert!(matches!(b.complete(hello()).await, Err(LlmError::Blocked(_))));

        let b = OpenAiBackend::new(sandbox(), SecretString::from("sk-test".to_string()), "gpt-4o")
            .with_url("https://proxy.example.org/v1/chat/completions");
        assert!(matches!(b.complete(hello()).await, Err(LlmError::Blocked(_))));
    }

    #[test]
    fn test_openai_backend_is_not_local() {
        let b = OpenAiBackend::new(sandbox(), SecretString::from("sk-test".to_string()), "gpt-4o");
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "gpt-4o");
    }

    #[test]
    fn test_openai_compatible_with_no_key_on_loopback_is_local() {
        let b = OpenAiCompatibleBackend::new(sandbox(), "http://localhost:11434", "llama3:8b", None);
        assert_eq!(b.model_id(), "llama3:8b");
        assert!(b.is_local());
        let b = OpenAiCompatibleBackend::new(sandbox(), "https://openrouter.ai/api", "x", None);
        assert!(!b.is_local());
    }

    #[test]
    fn test_chat_body_defaults_to_deterministic_sampling() {
        let req = LlmRequest {
            messages: vec![Message::system("s"), Message::user("u")],
            model: None,
            max_tokens: None,
            temperature: None,
        };
        let body = chat_body(&req, "gpt-4o");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "model": "gpt-4o-2024",
            "choices": [{ "message": { "content": "hello" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        });
        let r = parse_openai_response(&json, "gpt-4o").unwrap();
        assert_eq!(r.content, "hello");
        assert_eq!(r.model, "gpt-4o-2024");
        assert_eq!(r.completion_tokens, 3);

        let empty = serde_json::json!({ "choices": [] });
        assert!(matches!(parse_openai_response(&empty, "m"), Err(LlmError::EmptyCompletion)));
    }
}
