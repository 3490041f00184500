//! Thin HTTP client for the tasks API.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

use tbm_core::retry::MutationError;

/// Client for the tasks API driven by `tbm run`.
///
/// Mutation calls report failures as [`MutationError`] so the engine can
/// classify and retry them; only construction and the snapshot prefetch use
/// anyhow, since those abort the command outright.
pub struct TasksApi {
    client: Client,
    base_url: String,
    token: String,
}

impl TasksApi {
    /// Build a client for the given base URL and bearer token.
    pub fn new(base_url: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetch every task; the prefetch collaborator for merge updates.
    pub async fn list_tasks(&self) -> Result<Vec<Value>> {
        let url = format!("{}/tasks", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {} returned {}", url, status);
        }
        response.json::<Vec<Value>>().await.context("decode task list")
    }

    /// Create a task, in the named list when given.
    pub async fn insert_task(&self, list: Option<&str>, task: &Value) -> Result<Value, MutationError> {
        let url = match list {
            Some(list) => format!("{}/lists/{}/tasks", self.base_url, list),
            None => format!("{}/tasks", self.base_url),
        };
        self.execute(self.client.post(&url).json(task)).await
    }

    /// Replace a task with the given full representation.
    pub async fn update_task(&self, id: &str, body: &Value) -> Result<Value, MutationError> {
        let url = format!("{}/tasks/{}", self.base_url, id);
        self.execute(self.client.put(&url).json(body)).await
    }

    /// Move a task to another list, optionally after a sibling.
    pub async fn move_task(
        &self,
        id: &str,
        to: &str,
        previous: Option<&str>,
    ) -> Result<Value, MutationError> {
        let url = format!("{}/tasks/{}/move", self.base_url, id);
        let mut payload = serde_json::json!({ "to": to });
        if let Some(previous) = previous {
            payload["previous"] = Value::String(previous.to_string());
        }
        self.execute(self.client.post(&url).json(&payload)).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, MutationError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| MutationError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MutationError::Api {
                status: Some(status.as_u16()),
                message: error_message(&body),
            });
        }
        let text = response
            .text()
            .await
            .map_err(|e| MutationError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| MutationError::Api {
            status: None,
            message: format!("invalid response body: {}", e),
        })
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
