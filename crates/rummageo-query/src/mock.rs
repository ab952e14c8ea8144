//! In-memory GraphQL executor for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use rummageo_common::error::{Result, RummageoError};

use crate::documents::Operation;
use crate::graphql::GraphQlExecutor;

#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<HashMap<&'static str, Value>>,
    delays: Mutex<Vec<Duration>>,
    pub calls: Mutex<Vec<(&'static str, Value)>>,
}

impl MockExecutor {
    pub fn with(self, op: &Operation, data: Value) -> Self {
        self.responses.lock().unwrap().insert(op.name, data);
        self
    }

    /// Delays applied to successive calls, in order.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock().unwrap() = delays;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_variables(&self) -> Value {
        self.calls.lock().unwrap().last().map(|(_, v)| v.clone()).unwrap_or(Value::Null)
    }
}

#[async_trait]
impl GraphQlExecutor for MockExecutor {
    async fn execute(&self, operation: &Operation, variables: Value) -> Result<Value> {
        let delay = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((operation.name, variables));
            self.delays.lock().unwrap().get(calls.len() - 1).copied()
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(operation.name)
            .cloned()
            .ok_or_else(|| RummageoError::GraphQl(format!("no mock for {}", operation.name)))
    }
}
