use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::models::{Inbox, User};

/// Read-only identity/preferences lookups. The backing store is external;
/// the engine never writes to it.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_inbox(&self, inbox_id: &str) -> anyhow::Result<Option<Inbox>>;
    async fn get_user_by_id(&self, user_id: &str) -> anyhow::Result<Option<User>>;
}

/// Convex HTTP query client. Each call is a single `POST /api/query` with a
/// function path and arguments.
pub struct ConvexDirectory {
    deployment_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ConvexResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

impl ConvexDirectory {
    pub fn new(deployment_url: String) -> Self {
        Self {
            deployment_url,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn query(
        &self,
        path: &str,
        args: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .client
            .post(format!("{}/api/query", self.deployment_url))
            .json(&json!({ "path": path, "args": args, "format": "json" }))
            .send()
            .await
            .context("failed to query Convex")?
            .error_for_status()
            .context("Convex query returned error status")?;

        let data: ConvexResponse = resp
            .json()
            .await
            .context("failed to parse Convex response")?;

        if data.status != "success" {
            anyhow::bail!(
                "Convex query {path} failed: {}",
                data.error_message.unwrap_or_else(|| "unknown".to_string())
            );
        }

        Ok(data.value)
    }
}

#[async_trait]
impl Directory for ConvexDirectory {
    async fn get_inbox(&self, inbox_id: &str) -> anyhow::Result<Option<Inbox>> {
        let value = self
            .query("inbox:getByInboxId", json!({ "inboxId": inbox_id }))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let inbox: Inbox = serde_json::from_value(value).context("malformed inbox record")?;
        Ok(Some(inbox))
    }

    async fn get_user_by_id(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        let value = self.query("user:getById", json!({ "id": user_id })).await?;
        if value.is_null() {
            return Ok(None);
        }
        // Convex exposes its own `_id`; map it onto the engine's user id.
        let mut value = value;
        if let Some(obj) = value.as_object_mut() {
            if !obj.contains_key("id") {
                if let Some(raw_id) = obj.get("_id").cloned() {
                    obj.insert("id".to_string(), raw_id);
                }
            }
        }
        let user: User = serde_json::from_value(value).context("malformed user record")?;
        Ok(Some(user))
    }
}
