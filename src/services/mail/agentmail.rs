use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::{MailProvider, OutboundReply};
use crate::models::ThreadMessage;

const BASE_URL: &str = "https://api.agentmail.to/v0";

pub struct AgentMailClient {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ThreadResponse {
    #[serde(default)]
    messages: Vec<ThreadMessageWire>,
}

#[derive(Deserialize)]
struct ThreadMessageWire {
    #[serde(default)]
    from: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    text: String,
}

impl AgentMailClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl MailProvider for AgentMailClient {
    async fn reply(
        &self,
        inbox_id: &str,
        message_id: &str,
        reply: &OutboundReply,
    ) -> anyhow::Result<()> {
        let mut body = json!({ "text": reply.text });

        if let Some(subject) = &reply.subject {
            body["subject"] = json!(subject);
        }
        if !reply.cc.is_empty() {
            body["cc"] = json!(reply.cc);
        }
        if let Some(ics) = &reply.ics_attachment {
            body["attachments"] = json!([{
                "filename": "invite.ics",
                "content_type": "text/calendar; method=REQUEST; charset=\"UTF-8\"",
                "content": base64::engine::general_purpose::STANDARD.encode(ics),
            }]);
        }

        self.client
            .post(format!(
                "{BASE_URL}/inboxes/{inbox_id}/messages/{message_id}/reply"
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to send AgentMail reply")?
            .error_for_status()
            .context("AgentMail reply endpoint returned error")?;

        Ok(())
    }

    async fn fetch_thread(&self, thread_id: &str) -> anyhow::Result<Vec<ThreadMessage>> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/threads/{thread_id}"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("failed to fetch AgentMail thread")?
            .error_for_status()
            .context("AgentMail thread endpoint returned error")?;

        let thread: ThreadResponse = resp
            .json()
            .await
            .context("failed to parse AgentMail thread response")?;

        Ok(thread
            .messages
            .into_iter()
            .map(|m| ThreadMessage {
                from: m.from,
                timestamp: m.timestamp,
                text: m.text,
            })
            .collect())
    }
}
