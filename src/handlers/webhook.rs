use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::models::WebhookPayload;
use crate::services::orchestrator;
use crate::state::AppState;

/// POST /webhook/email: ack immediately, process in a spawned task.
/// Idempotency and redelivery are the transport's concern; processing errors
/// are logged here and never travel back to the sender.
pub async fn email_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Json<serde_json::Value> {
    tracing::info!(
        event_id = %payload.event_id,
        event_type = %payload.event_type,
        from = %payload.message.from,
        "webhook received"
    );

    let state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = orchestrator::handle_inbound_message(&state, &payload.message).await {
            tracing::error!(
                error = %e,
                event_id = %payload.event_id,
                "failed to process inbound message"
            );
        }
    });

    Json(serde_json::json!({ "success": true }))
}

/// POST /webhook/email/sync: same pipeline, processed inline. Used for
/// manual testing so processing errors surface in the HTTP response.
pub async fn email_webhook_sync(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(event_id = %payload.event_id, "sync webhook received");

    orchestrator::handle_inbound_message(&state, &payload.message).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
