use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_model: String,
    pub hyperspell_api_key: String,
    pub agentmail_api_key: String,
    pub convex_url: String,
    /// Meeting length used when the counterpart gives none.
    pub default_meeting_minutes: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            hyperspell_api_key: env::var("HYPERSPELL_API_KEY").unwrap_or_default(),
            agentmail_api_key: env::var("AGENTMAIL_API_KEY").unwrap_or_default(),
            convex_url: env::var("CONVEX_URL").unwrap_or_default(),
            default_meeting_minutes: env::var("DEFAULT_MEETING_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}
