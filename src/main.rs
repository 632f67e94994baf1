use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use frontdesk::config::AppConfig;
use frontdesk::handlers;
use frontdesk::services::calendar::hyperspell::HyperspellClient;
use frontdesk::services::directory::ConvexDirectory;
use frontdesk::services::mail::agentmail::AgentMailClient;
use frontdesk::services::oracle::openai::OpenAiOracle;
use frontdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    anyhow::ensure!(
        !config.openai_api_key.is_empty(),
        "OPENAI_API_KEY must be set"
    );
    anyhow::ensure!(
        !config.hyperspell_api_key.is_empty(),
        "HYPERSPELL_API_KEY must be set"
    );
    anyhow::ensure!(
        !config.agentmail_api_key.is_empty(),
        "AGENTMAIL_API_KEY must be set"
    );
    anyhow::ensure!(!config.convex_url.is_empty(), "CONVEX_URL must be set");

    tracing::info!(model = %config.openai_model, "using OpenAI oracle");

    let state = Arc::new(AppState {
        oracle: Box::new(OpenAiOracle::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )),
        calendar: Box::new(HyperspellClient::new(config.hyperspell_api_key.clone())),
        mail: Box::new(AgentMailClient::new(config.agentmail_api_key.clone())),
        directory: Box::new(ConvexDirectory::new(config.convex_url.clone())),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/email", post(handlers::webhook::email_webhook))
        .route(
            "/webhook/email/sync",
            post(handlers::webhook::email_webhook_sync),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
