use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CalendarSearchResult, CalendarSource};

const BASE_URL: &str = "https://api.hyperspell.com";

pub struct HyperspellClient {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    documents: Vec<super::CalendarDocument>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl HyperspellClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Searches run against a per-user token, not the app key.
    async fn user_token(&self, user_id: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(format!("{BASE_URL}/auth/user_token"))
            .bearer_auth(&self.api_key)
            .json(&json!({ "user_id": user_id }))
            .send()
            .await
            .context("failed to request Hyperspell user token")?
            .error_for_status()
            .context("Hyperspell token endpoint returned error")?;

        let token: TokenResponse = resp
            .json()
            .await
            .context("failed to parse Hyperspell token response")?;
        Ok(token.token)
    }
}

#[async_trait]
impl CalendarSource for HyperspellClient {
    async fn search(
        &self,
        query: &str,
        user_id: &str,
        want_answer: bool,
    ) -> anyhow::Result<CalendarSearchResult> {
        let token = self.user_token(user_id).await?;

        let resp = self
            .client
            .post(format!("{BASE_URL}/memories/search"))
            .bearer_auth(&token)
            .json(&json!({
                "query": query,
                "answer": want_answer,
                "sources": ["google_calendar", "vault"],
            }))
            .send()
            .await
            .context("failed to query Hyperspell")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Hyperspell search error: {status}");
        }

        let data: SearchResponse = resp
            .json()
            .await
            .context("failed to parse Hyperspell search response")?;

        if !data.errors.is_empty() {
            anyhow::bail!("Hyperspell reported source errors: {:?}", data.errors);
        }

        Ok(CalendarSearchResult {
            answer: data.answer,
            documents: data.documents,
        })
    }
}
