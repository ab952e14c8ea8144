//! GraphQL transport.
//!
//! Operations are posted as `{ operationName, query, variables }` to the
//! `/graphql` endpoint. The `data` member is returned; any entry in
//! `errors` fails the call.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use rummageo_common::error::{Result, RummageoError};
use rummageo_common::sandbox::SandboxClient;

use crate::documents::Operation;

/// Anything able to run a GraphQL operation and return its `data` payload.
#[async_trait]
pub trait GraphQlExecutor: Send + Sync {
    async fn execute(&self, operation: &Operation, variables: Value) -> Result<Value>;
}

/// Run an operation and decode its `data` payload.
pub async fn query<T: DeserializeOwned>(
    exec: &dyn GraphQlExecutor,
    operation: &Operation,
    variables: Value,
) -> Result<T> {
    let data = exec.execute(operation, variables).await?;
    Ok(serde_json::from_value(data)?)
}

pub struct GraphQlClient {
    client: SandboxClient,
    endpoint: String,
}

impl GraphQlClient {
    pub fn new(client: SandboxClient, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphQlExecutor for GraphQlClient {
    #[instrument(skip(self, variables), fields(op = operation.name))]
    async fn execute(&self, operation: &Operation, variables: Value) -> Result<Value> {
        let body = serde_json::json!({
            "operationName": operation.name,
            "query": operation.document,
            "variables": variables,
        });

        let resp = self.client
            .post(&self.endpoint)?
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let json: Value = resp.json().await?;
        debug!(status, "GraphQL response received");
        extract_data(json, status)
    }
}

/// Pull `data` out of a GraphQL response envelope.
pub fn extract_data(mut json: Value, status: u16) -> Result<Value> {
    if let Some(errors) = json["errors"].as_array().filter(|e| !e.is_empty()) {
        let message = errors
            .iter()
            .map(|e| e["message"].as_str().unwrap_or("unknown error"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RummageoError::GraphQl(message));
    }
    if status >= 400 {
        return Err(RummageoError::Upstream {
            status,
            message: json["message"].as_str().unwrap_or("GraphQL request failed").to_string(),
        });
    }
    match json.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(RummageoError::GraphQl("response carried no data".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_data_returns_payload() {
        let json = serde_json::json!({ "data": { "backgrounds": { "nodes": [] } } });
        let data = extract_data(json, 200).unwrap();
        assert!(data["backgrounds"]["nodes"].is_array());
    }

    #[test]
    fn test_extract_data_joins_error_messages() {
        let json = serde_json::json!({
            "data": null,
            "errors": [{ "message": "bad gene" }, { "message": "bad id" }]
        });
        match extract_data(json, 200) {
            Err(RummageoError::GraphQl(msg)) => assert_eq!(msg, "bad gene; bad id"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_extract_data_rejects_http_failures_and_empty_data() {
        let err = extract_data(serde_json::json!({ "message": "down" }), 502).unwrap_err();
        assert!(matches!(err, RummageoError::Upstream { status: 502, .. }));
        assert!(extract_data(serde_json::json!({ "data": null }), 200).is_err());
    }
}
