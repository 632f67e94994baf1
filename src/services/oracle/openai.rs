use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Message, TextOracle};

pub struct OpenAiOracle {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    fn build_messages(&self, prompt: &str, system: &[Message]) -> Vec<serde_json::Value> {
        let mut messages: Vec<serde_json::Value> = system
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();
        messages.push(json!({ "role": "user", "content": prompt }));
        messages
    }

    async fn send(&self, body: serde_json::Value) -> anyhow::Result<String> {
        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call OpenAI API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse OpenAI response")?;

        if !status.is_success() {
            anyhow::bail!("OpenAI API error ({}): {}", status, data);
        }

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in OpenAI response"))
    }
}

#[async_trait]
impl TextOracle for OpenAiOracle {
    async fn complete(
        &self,
        prompt: &str,
        system: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": self.build_messages(prompt, system),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        self.send(body).await
    }

    async fn complete_structured(
        &self,
        prompt: &str,
        schema: serde_json::Value,
        schema_name: &str,
        system: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> anyhow::Result<serde_json::Value> {
        let body = json!({
            "model": self.model,
            "messages": self.build_messages(prompt, system),
            "temperature": temperature,
            "max_tokens": max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                },
            },
        });

        let content = self.send(body).await?;
        serde_json::from_str(&content).context("structured response was not valid JSON")
    }
}
