use serde::{Deserialize, Serialize};

use super::slot::TimeSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailAction {
    #[serde(rename = "OFFER")]
    Offer,
    #[serde(rename = "CHECK_TIME")]
    CheckTime,
    #[serde(rename = "CONFIRM")]
    Confirm,
    #[serde(rename = "COUNTEROFFER")]
    CounterOffer,
}

impl EmailAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailAction::Offer => "OFFER",
            EmailAction::CheckTime => "CHECK_TIME",
            EmailAction::Confirm => "CONFIRM",
            EmailAction::CounterOffer => "COUNTEROFFER",
        }
    }
}

/// Stage of the reservation negotiation. Threaded through by the
/// orchestrator; the selector itself holds no session data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Initial,
    AfterCheckTime,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Initial => "INITIAL",
            ConversationState::AfterCheckTime => "AFTER_CHECK_TIME",
        }
    }
}

/// One decision per inbound message, consumed immediately by the orchestrator.
#[derive(Debug, Clone)]
pub struct ActionDecision {
    pub action: EmailAction,
    pub confidence: f64,
    pub reasoning: String,
    pub time_suggestions: Vec<TimeSlot>,
}

/// Inputs for reply generation, keyed by the action that produced them.
/// Exhaustively matched in the composer so a new action cannot be added
/// without updating every consumer.
#[derive(Debug, Clone)]
pub enum EmailGenerationContext {
    Offer {
        available_time_slots: Vec<TimeSlot>,
    },
    Confirm {
        confirmed_time_slot: TimeSlot,
    },
    CounterOffer {
        proposed_time_slot: TimeSlot,
        alternative_time_slots: Vec<TimeSlot>,
    },
    CheckTime {
        time_suggestions: Vec<TimeSlot>,
    },
}

impl EmailGenerationContext {
    pub fn action(&self) -> EmailAction {
        match self {
            EmailGenerationContext::Offer { .. } => EmailAction::Offer,
            EmailGenerationContext::Confirm { .. } => EmailAction::Confirm,
            EmailGenerationContext::CounterOffer { .. } => EmailAction::CounterOffer,
            EmailGenerationContext::CheckTime { .. } => EmailAction::CheckTime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(
            serde_json::to_string(&EmailAction::CheckTime).unwrap(),
            "\"CHECK_TIME\""
        );
        let action: EmailAction = serde_json::from_str("\"COUNTEROFFER\"").unwrap();
        assert_eq!(action, EmailAction::CounterOffer);
    }

    #[test]
    fn test_context_matches_action() {
        let slot = TimeSlot::parse("2025-11-14", "10:00", "11:00").unwrap();
        let ctx = EmailGenerationContext::Confirm {
            confirmed_time_slot: slot,
        };
        assert_eq!(ctx.action(), EmailAction::Confirm);
    }
}
