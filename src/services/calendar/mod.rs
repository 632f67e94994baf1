pub mod hyperspell;

use async_trait::async_trait;
use serde::Deserialize;

/// One opaque record from the calendar feed. `content` may be a JSON string,
/// an already-structured object, or free text; treat it as untrusted.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarSearchResult {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub documents: Vec<CalendarDocument>,
}

/// Calendar feed lookup for a user identity. Errors are expected outcomes
/// (auth, transport, upstream), and callers degrade rather than crash.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn search(
        &self,
        query: &str,
        user_id: &str,
        want_answer: bool,
    ) -> anyhow::Result<CalendarSearchResult>;
}
