use serde::{Deserialize, Serialize};

/// Inbound webhook payload, shaped after the mail provider's event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub event_kind: String,
    pub event_id: String,
    pub event_type: String,
    pub message: InboundMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub message_id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub inbox_id: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    pub text: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub timestamp: String,
}

/// Classification verdict attached to a message before any action is taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub labels: Vec<String>,
    #[serde(rename = "isSpam")]
    pub is_spam: bool,
    #[serde(rename = "isReservation")]
    pub is_reservation: bool,
}

impl Classification {
    /// Safe default when the classifier cannot run: neither spam nor a
    /// reservation, so no reply is attempted.
    pub fn unknown() -> Self {
        Self {
            labels: Vec::new(),
            is_spam: false,
            is_reservation: false,
        }
    }
}

/// A prior message in the same conversation, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub from: String,
    pub timestamp: String,
    pub text: String,
}
