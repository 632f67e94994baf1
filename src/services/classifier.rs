use serde_json::json;

use crate::models::Classification;
use crate::services::oracle::{Message, TextOracle};

const SYSTEM_PROMPT: &str = "You are an email classification system of secretaries. Classify emails into one or more of these categories: SPAM, RESERVATION.\n\n\
Rules:\n\
- SPAM: Unsolicited commercial emails, phishing attempts, suspicious content\n\
- RESERVATION: Emails about appointments, reservations at businesses, meeting or conference calls.\n\n\
Examples:\n\
- Hotel booking confirmation -> {\"labels\": [\"RESERVATION\"], \"isSpam\": false, \"isReservation\": true}\n\
- Promotional email -> {\"labels\": [\"SPAM\"], \"isSpam\": true, \"isReservation\": false}\n\
- Restaurant reservation -> {\"labels\": [\"RESERVATION\"], \"isSpam\": false, \"isReservation\": true}";

const BODY_LIMIT: usize = 1000;

/// Label an inbound email. Failure yields the safe default (neither spam nor
/// reservation) so the pipeline simply takes no action.
pub async fn classify_email(oracle: &dyn TextOracle, subject: &str, body: &str) -> Classification {
    tracing::info!(subject = %subject, "classifying email");

    let schema = json!({
        "type": "object",
        "properties": {
            "labels": { "type": "array", "items": { "type": "string" } },
            "isSpam": { "type": "boolean" },
            "isReservation": { "type": "boolean" },
        },
        "required": ["labels", "isSpam", "isReservation"],
        "additionalProperties": false,
    });

    let prompt = format!("Subject: {subject}\n\nBody: {}", truncate(body, BODY_LIMIT));

    let result = oracle
        .complete_structured(
            &prompt,
            schema,
            "EmailClassification",
            &[Message::system(SYSTEM_PROMPT)],
            0.3,
            100,
        )
        .await;

    match result.and_then(|v| Ok(serde_json::from_value::<Classification>(v)?)) {
        Ok(classification) => {
            tracing::info!(
                labels = ?classification.labels,
                is_spam = classification.is_spam,
                is_reservation = classification.is_reservation,
                "email classified"
            );
            classification
        }
        Err(e) => {
            tracing::error!(error = %e, "classification failed, defaulting to no action");
            Classification::unknown()
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
