pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Text-completion service used for classification and decision-making.
/// Failures must surface as errors; callers carry their own fallbacks.
#[async_trait]
pub trait TextOracle: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> anyhow::Result<String>;

    /// Completion constrained to `schema` (a JSON Schema object). The result
    /// is the parsed JSON; schema-level validation happens upstream, callers
    /// still deserialize into their own types.
    async fn complete_structured(
        &self,
        prompt: &str,
        schema: serde_json::Value,
        schema_name: &str,
        system: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> anyhow::Result<serde_json::Value>;
}
